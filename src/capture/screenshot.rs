use crate::capture::config::{MAX_VISUAL_SCROLL_PX, PROGRESS_STEPS, SCROLL_STEP_PX};
use crate::capture::controller::SessionId;
use crate::capture::timer::ScheduledTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotPhase {
    /// Progress ticks are advancing the simulated scroll.
    Scanning,
    /// Scroll reset to the top; waiting for the page to repaint.
    Settling,
    /// The rasterizer is producing the image.
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced { step: u32 },
    /// The last step ran; progress is at 100 and the settle delay should start.
    Completed,
    /// The tick arrived outside the scanning phase.
    Ignored,
}

/// State held while the simulated page screenshot is running.
///
/// `task` is whichever timer or render job the current phase is waiting on;
/// replacing or dropping it cancels the previous one.
#[derive(Debug)]
pub struct ScreenshotSession {
    id: SessionId,
    step: u32,
    scroll_offset: u32,
    phase: ScreenshotPhase,
    task: Option<ScheduledTask>,
}

impl ScreenshotSession {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            step: 0,
            scroll_offset: 0,
            phase: ScreenshotPhase::Scanning,
            task: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn phase(&self) -> ScreenshotPhase {
        self.phase
    }

    /// Percentage complete, 0 to 100.
    pub fn progress(&self) -> u8 {
        (self.step.min(PROGRESS_STEPS) * 100 / PROGRESS_STEPS) as u8
    }

    pub fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    /// Scroll offset the widget animates the page to.
    pub fn visual_scroll(&self) -> u32 {
        self.scroll_offset.min(MAX_VISUAL_SCROLL_PX)
    }

    /// One-based index of the screen being "captured".
    pub fn screen_number(&self) -> u32 {
        u32::from(self.progress()).div_ceil(20) + 1
    }

    pub(crate) fn set_task(&mut self, task: Option<ScheduledTask>) {
        self.task = task;
    }

    pub(crate) fn advance(&mut self) -> StepOutcome {
        if self.phase != ScreenshotPhase::Scanning {
            return StepOutcome::Ignored;
        }

        self.step += 1;
        if self.step >= PROGRESS_STEPS {
            self.step = PROGRESS_STEPS;
            self.scroll_offset = 0;
            self.phase = ScreenshotPhase::Settling;
            self.task = None;
            StepOutcome::Completed
        } else {
            self.scroll_offset += SCROLL_STEP_PX;
            StepOutcome::Advanced { step: self.step }
        }
    }

    /// Move from settling to rendering. Returns false if not settling.
    pub(crate) fn begin_render(&mut self) -> bool {
        if self.phase != ScreenshotPhase::Settling {
            return false;
        }
        self.phase = ScreenshotPhase::Rendering;
        true
    }
}
