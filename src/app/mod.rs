use crate::api::{ApiCommand, ApiServer, ApiState};
use crate::capture::native::NativeCaptureProvider;
use crate::capture::CaptureProvider;
use crate::config::Config;
use crate::controls::{dispatch, Action, Shortcut};
use crate::conversion::ffmpeg::{check_ffmpeg_available, FfmpegTranscoder};
use crate::conversion::ConversionGateway;
use crate::history::HistoryLog;
use crate::i18n::Localizer;
use crate::prefs::Preferences;
use crate::session::{RecordingSession, SessionConfig, SessionError, SessionStatusHandle};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How often elapsed time, size and audio level are pushed to the status.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run_service() -> Result<()> {
    info!("Starting aro-recorder service");

    let config = Config::load()?;
    let prefs = Preferences::load()?;
    let defaults = config.recording.session_config()?;
    let output_dir = config.conversion.output_dir()?;

    let ffmpeg_path = config.conversion.ffmpeg_path();
    if !check_ffmpeg_available(ffmpeg_path.as_deref()) {
        warn!("FFmpeg not found; screen capture and conversion will be unavailable");
    }

    let capture: Arc<dyn CaptureProvider> =
        Arc::new(NativeCaptureProvider::new(ffmpeg_path.clone()));
    let gateway = ConversionGateway::new(Box::new(FfmpegTranscoder::new(ffmpeg_path)));
    let history = HistoryLog::new();
    let status_handle = SessionStatusHandle::default();

    let session = RecordingSession::new(
        capture,
        gateway,
        history.clone(),
        status_handle.clone(),
        config.recording.session_options(),
    );

    let localizer = Localizer::new(&config.ui.locale);
    let locale = prefs
        .locale()
        .map(str::to_string)
        .unwrap_or_else(|| config.ui.locale.clone());
    spawn_status_logger(&status_handle, localizer.clone(), locale);

    let (tx, rx) = mpsc::channel::<ApiCommand>(10);
    let state = ApiState {
        tx,
        status: status_handle,
        history,
        prefs: Arc::new(Mutex::new(prefs)),
        localizer,
        default_locale: config.ui.locale.clone(),
        defaults,
        output_dir,
    };
    let api_server = ApiServer::new(config.api.port, state);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("aro-recorder is ready!");
    info!(
        "Start recording: curl -X POST http://127.0.0.1:{}/start",
        config.api.port
    );

    run_loop(session, rx).await
}

/// Drive one session from API commands, recorder events and a progress tick
/// until the command channel closes.
pub async fn run_loop(
    mut session: RecordingSession,
    mut rx: mpsc::Receiver<ApiCommand>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(command) => handle_command(&mut session, command).await,
                None => break,
            },
            event = session.next_event() => session.handle_event(event).await,
            _ = ticker.tick() => {
                if session.status().is_capturing() {
                    session.publish_progress().await;
                }
            }
        }
    }

    info!("Command channel closed, shutting down session");
    session.teardown().await;
    Ok(())
}

async fn handle_command(session: &mut RecordingSession, command: ApiCommand) {
    match command {
        ApiCommand::Start { config, reply } => {
            let result = session.start(config).await;
            match &result {
                Ok(()) => info!("Recording started"),
                Err(e) => warn!("Recording did not start: {}", e),
            }
            let _ = reply.send(result);
        }
        ApiCommand::Pause { reply } => {
            let result = session.pause().await;
            if let Err(e) = &result {
                error!("Failed to pause: {}", e);
            }
            let _ = reply.send(result);
        }
        ApiCommand::Resume { reply } => {
            let result = session.resume().await;
            if let Err(e) = &result {
                error!("Failed to resume: {}", e);
            }
            let _ = reply.send(result);
        }
        ApiCommand::Stop { reply } => {
            let result = session.stop().await;
            match &result {
                Ok(Some(artifact)) => info!("Recording saved as {}", artifact.file_name()),
                Ok(None) => debug!("Stop had nothing to do"),
                Err(e) => error!("Recording failed while stopping: {}", e),
            }
            let _ = reply.send(result.map(|artifact| artifact.map(|a| a.summary())));
        }
        ApiCommand::Shortcut {
            shortcut,
            start_config,
            reply,
        } => {
            let result = apply_shortcut(session, &shortcut, start_config).await;
            if let Err(e) = &result {
                warn!("Shortcut {} failed: {}", shortcut, e);
            }
            let _ = reply.send(result);
        }
    }
}

/// Run the action a shortcut maps to for the session's current status.
/// Theme toggling is left to the caller, which owns the preferences.
async fn apply_shortcut(
    session: &mut RecordingSession,
    shortcut: &Shortcut,
    start_config: SessionConfig,
) -> Result<Option<Action>, SessionError> {
    let status = session.status();
    let Some(action) = dispatch(shortcut, status) else {
        info!("Shortcut {} ignored while {}", shortcut, status.as_str());
        return Ok(None);
    };

    info!("Shortcut {} -> {}", shortcut, action);
    match action {
        Action::Start => session.start(start_config).await?,
        Action::Pause => session.pause().await?,
        Action::Resume => session.resume().await?,
        Action::Stop => {
            session.stop().await?;
        }
        Action::ToggleTheme => {}
    }
    Ok(Some(action))
}

/// Log each status change as the localized line a user would see.
fn spawn_status_logger(status: &SessionStatusHandle, localizer: Localizer, locale: String) {
    let mut updates = status.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    let text = update
                        .message
                        .as_ref()
                        .map(|m| localizer.status_text(m, &locale))
                        .unwrap_or_default();
                    info!("[{}] {}", update.status.as_str(), text);
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Status logger skipped {} updates", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
