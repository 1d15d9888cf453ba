use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use tracker_calibration::calibration::{
    CalibrationEvent, CommandQueue, EventSink, ManualSession, PointCollector, RigidTransform,
    SessionCommand, SessionOutcome,
};
use tracker_calibration::config::CalibrationConfig;
use tracker_calibration::math::{quat_from_yaw_pitch_roll, Vec3};
use tracker_calibration::simulation::SimulatedRig;
use tracker_calibration::state::{CalibrationStore, FileCalibrationStore};
use tracker_calibration::tracking::JoystickState;

const DEVICE_ID: &str = "SIMULATED-KINECT-0001";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Auto,
    Manual,
}

fn parse_args() -> Result<(Mode, Option<PathBuf>)> {
    let mut mode = Mode::Auto;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--manual" => mode = Mode::Manual,
            "--auto" => mode = Mode::Auto,
            other if other.starts_with("--") => anyhow::bail!("Unknown option: {}", other),
            other => config_path = Some(PathBuf::from(other)),
        }
    }
    Ok((mode, config_path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let (mode, config_path) = parse_args()?;
    let config = match &config_path {
        Some(path) => CalibrationConfig::load(path)?,
        None => CalibrationConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_max_level(config.logging.max_level())
        .init();

    let truth = RigidTransform::new(
        quat_from_yaw_pitch_roll(0.6, -0.15, 0.0),
        Vec3::new(0.35, -0.2, 1.1),
    );
    let rig = Arc::new(SimulatedRig::new(truth).with_origin(Vec3::new(0.0, 0.9, 2.0)));

    let mut store = FileCalibrationStore::from_settings(&config.storage).await?;
    match config.auto.points {
        Some(points) => info!("Using {} anchor points from the configuration", points),
        None => info!("Using {} saved anchor points", store.points_number()),
    }

    let (events, event_rx) = EventSink::channel();
    let event_logger = std::thread::spawn(move || {
        for event in event_rx.iter() {
            match event {
                CalibrationEvent::PointCaptured { index, reference, target } => info!(
                    "Point {} captured: headset {:?}, device {:?}",
                    index + 1,
                    reference,
                    target
                ),
                other => debug!("{:?}", other),
            }
        }
    });

    let (tx, commands) = CommandQueue::channel();

    let outcome = match mode {
        Mode::Auto => {
            let mut collector = PointCollector::new(DEVICE_ID, config.auto.clone(), commands)?
                .with_events(events);
            let outcome = collector.run(rig.as_ref(), &mut store).await?;
            drop(collector);
            outcome
        }
        Mode::Manual => {
            let script_rig = Arc::clone(&rig);
            let script = tokio::spawn(async move {
                script_rig.set_joysticks(JoystickState::new((0.5, -0.5), (0.0, 0.25)));
                tokio::time::sleep(Duration::from_secs(1)).await;
                let _ = tx.send(SessionCommand::SwapMode);
                script_rig.set_joysticks(JoystickState::new((0.8, 0.0), (0.0, -0.3)));
                tokio::time::sleep(Duration::from_secs(1)).await;
                let _ = tx.send(SessionCommand::SetFineTune(true));
                tokio::time::sleep(Duration::from_millis(500)).await;
                let _ = tx.send(SessionCommand::Confirm);
                tx
            });

            let mut session =
                ManualSession::new(DEVICE_ID, config.manual.clone(), commands).with_events(events);
            let outcome = session.run(rig.as_ref(), rig.as_ref(), &mut store).await?;
            drop(session);
            drop(script.await?);
            outcome
        }
    };

    if event_logger.join().is_err() {
        warn!("Event logger thread panicked");
    }

    match outcome {
        SessionOutcome::Committed(state) => {
            info!("Ground truth: t = {:?}, R = {:?}", truth.translation, truth.rotation);
            info!(
                "Stored calibration: t = {:?}, R = {:?}, origin = {:?}",
                state.translation, state.rotation, state.origin
            );
            if mode == Mode::Auto {
                let angle_error = state.rotation.angle_to(&truth.rotation);
                let translation_error = (state.translation - truth.translation).norm();
                info!(
                    "Recovery error: {:.6} rad, {:.6} m",
                    angle_error, translation_error
                );
            }
        }
        SessionOutcome::Aborted => {
            warn!("Calibration aborted, persisted state: {:?}", store.get(DEVICE_ID));
        }
    }

    Ok(())
}
