use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Result};
use taskfusion_core::{Phase, PhaseCompletion, Session};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::cli::FocusArgs;

const TICK: Duration = Duration::from_secs(1);
const REPORT_EVERY_SECONDS: u32 = 60;

/// Drive the session's focus timer from a one-second interval until the
/// phase completes or the user interrupts with Ctrl-C.
pub async fn run<W: Write>(session: &mut Session, args: &FocusArgs, mut writer: W) -> Result<()> {
    if let Some(id) = args.task_id.as_deref() {
        if session.store().get(id).is_none() {
            bail!("Not found: {id}");
        }
    }

    if !session.start_focus(args.task_id.as_deref()) {
        warn!("focus timer already running");
    }
    let Some(completion) = run_phase(session, &mut writer).await? else {
        return Ok(());
    };
    report_completion(session, &completion, &mut writer)?;

    if args.with_break && completion.phase == Phase::Focus {
        // The timer has already switched to the break phase and waits in Idle.
        session.start_focus(None);
        if let Some(completion) = run_phase(session, &mut writer).await? {
            report_completion(session, &completion, &mut writer)?;
        }
    }
    Ok(())
}

async fn run_phase<W: Write>(
    session: &mut Session,
    writer: &mut W,
) -> Result<Option<PhaseCompletion>> {
    let phase = session.timer().phase();
    writeln!(
        writer,
        "{} started: {}",
        phase.label(),
        session.timer().display_text()
    )?;
    info!(phase = phase.label(), remaining = session.timer().remaining_seconds(), "phase started");

    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval resolves immediately.
    ticker.tick().await;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(completion) = session.tick()? {
                    return Ok(Some(completion));
                }
                let remaining = session.timer().remaining_seconds();
                if remaining % REPORT_EVERY_SECONDS == 0 {
                    writeln!(writer, "{} {}", phase.label(), session.timer().display_text())?;
                }
            }
            _ = &mut interrupt => {
                session.pause_focus();
                writeln!(
                    writer,
                    "Interrupted with {} left in {}",
                    session.timer().display_text(),
                    phase.label()
                )?;
                session.stop_focus();
                return Ok(None);
            }
        }
    }
}

fn report_completion<W: Write>(
    session: &Session,
    completion: &PhaseCompletion,
    writer: &mut W,
) -> Result<()> {
    match (&completion.phase, completion.task_id.as_deref()) {
        (Phase::Focus, Some(id)) => {
            let title = session
                .store()
                .get(id)
                .map(|task| task.title.as_str())
                .unwrap_or("(deleted task)");
            writeln!(
                writer,
                "Focus complete: +{}m on {title}",
                completion.minutes_recorded
            )?;
        }
        (Phase::Focus, None) => writeln!(writer, "Focus complete")?,
        (Phase::Break, _) => writeln!(writer, "Break over")?,
    }
    Ok(())
}
