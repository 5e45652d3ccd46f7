use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::capture::config::{AppConfig, RegionHandle};
use crate::capture::controller::{CaptureController, CaptureDependencies, Notice};
use crate::capture::result::{CopyPayload, ObjectUrls};
use crate::capture::view::ControlView;
use crate::error::CaptureError;
use crate::shortcuts::{KeyChord, ShortcutAction};

type Responder<T> = oneshot::Sender<Result<T, CaptureError>>;

/// User-initiated operations, each answered through its responder.
#[derive(Debug)]
pub enum Command {
    StartRecording(Responder<()>),
    StartScreenshot(Responder<()>),
    TogglePause(Responder<bool>),
    Stop(Responder<()>),
    CancelScreenshot(Responder<()>),
    Retry(Responder<()>),
    Shortcut(KeyChord, Responder<Option<ShortcutAction>>),
    CopyResult(Responder<CopyPayload>),
    SaveResult(PathBuf, Responder<PathBuf>),
    SetRegion(RegionHandle, Responder<()>),
}

/// Cloneable front door to a controller running on its own task.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<ControlView>,
    notices: broadcast::Sender<Notice>,
    objects: ObjectUrls,
}

/// Start the control loop. Commands, timer ticks and host events are all
/// processed on this one task, in arrival order.
pub fn spawn_controller(
    config: AppConfig,
    deps: CaptureDependencies,
) -> Result<(ControllerHandle, JoinHandle<()>), CaptureError> {
    config.validate()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();
    let mut controller = CaptureController::new(config, deps, event_tx);
    let (view_tx, view_rx) = watch::channel(controller.view());

    let handle = ControllerHandle {
        commands: command_tx,
        view: view_rx,
        notices: controller.notice_sender(),
        objects: controller.objects().clone(),
    };

    let task = tokio::spawn(async move {
        log::info!("Capture controller running");
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => execute(&mut controller, command).await,
                    None => break,
                },
                Some(event) = event_rx.recv() => controller.dispatch(event).await,
            }

            let view = controller.view();
            view_tx.send_if_modified(|current| {
                if *current == view {
                    false
                } else {
                    *current = view;
                    true
                }
            });
        }
        log::info!("Capture controller stopped");
    });

    Ok((handle, task))
}

async fn execute(controller: &mut CaptureController, command: Command) {
    // A dropped responder only means the caller stopped waiting.
    match command {
        Command::StartRecording(reply) => {
            let _ = reply.send(controller.start_recording().await);
        }
        Command::StartScreenshot(reply) => {
            let _ = reply.send(controller.start_screenshot());
        }
        Command::TogglePause(reply) => {
            let _ = reply.send(controller.toggle_pause());
        }
        Command::Stop(reply) => {
            let _ = reply.send(controller.stop());
        }
        Command::CancelScreenshot(reply) => {
            let _ = reply.send(controller.cancel_screenshot());
        }
        Command::Retry(reply) => {
            let _ = reply.send(controller.retry());
        }
        Command::Shortcut(chord, reply) => {
            let _ = reply.send(controller.handle_shortcut(&chord).await);
        }
        Command::CopyResult(reply) => {
            let _ = reply.send(controller.copy_result());
        }
        Command::SaveResult(dir, reply) => {
            let _ = reply.send(controller.save_result(&dir));
        }
        Command::SetRegion(region, reply) => {
            controller.set_region(region);
            let _ = reply.send(Ok(()));
        }
    }
}

impl ControllerHandle {
    pub async fn start_recording(&self) -> Result<(), CaptureError> {
        self.request(Command::StartRecording).await
    }

    pub async fn start_screenshot(&self) -> Result<(), CaptureError> {
        self.request(Command::StartScreenshot).await
    }

    pub async fn toggle_pause(&self) -> Result<bool, CaptureError> {
        self.request(Command::TogglePause).await
    }

    pub async fn stop(&self) -> Result<(), CaptureError> {
        self.request(Command::Stop).await
    }

    pub async fn cancel_screenshot(&self) -> Result<(), CaptureError> {
        self.request(Command::CancelScreenshot).await
    }

    pub async fn retry(&self) -> Result<(), CaptureError> {
        self.request(Command::Retry).await
    }

    pub async fn shortcut(&self, chord: KeyChord) -> Result<Option<ShortcutAction>, CaptureError> {
        self.request(|reply| Command::Shortcut(chord, reply)).await
    }

    pub async fn copy_result(&self) -> Result<CopyPayload, CaptureError> {
        self.request(Command::CopyResult).await
    }

    pub async fn save_result(&self, dir: PathBuf) -> Result<PathBuf, CaptureError> {
        self.request(|reply| Command::SaveResult(dir, reply)).await
    }

    pub async fn set_region(&self, region: RegionHandle) -> Result<(), CaptureError> {
        self.request(|reply| Command::SetRegion(region, reply)).await
    }

    /// Latest published view.
    pub fn view(&self) -> ControlView {
        self.view.borrow().clone()
    }

    pub fn watch_view(&self) -> watch::Receiver<ControlView> {
        self.view.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Registry backing result URLs, for serving previews.
    pub fn objects(&self) -> &ObjectUrls {
        &self.objects
    }

    async fn request<T, F>(&self, make: F) -> Result<T, CaptureError>
    where
        F: FnOnce(Responder<T>) -> Command,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| CaptureError::ControllerClosed)?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)?
    }
}
