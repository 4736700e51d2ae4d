use std::io::{self, Write};
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::{Context, Result};
use cast_player::cli::Cli;
use cast_player::replay::ReplaySink;
use cast_player::summary::render_summary;
use cast_player::{load_timeline, logging, terminal};
use cast_timeline::{Player, PlayerConfig, ThreadScheduler};
use clap::Parser;

const INTERRUPT_POLL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = PlayerConfig::from_env();
    logging::init(config.log_filter.as_deref(), cli.verbose);
    if let Some(speed) = cli.speed {
        config.speed = speed;
    }

    let timeline = load_timeline(&cli.file)?;
    tracing::debug!(
        events = timeline.events().len(),
        skipped = timeline.skipped_lines().len(),
        max_time = timeline.max_time(),
        "loaded recording"
    );

    if cli.summary {
        print!("{}", render_summary(&timeline));
        return Ok(());
    }
    if timeline.is_empty() {
        eprintln!("no session: {} contains no events", cli.file.display());
        return Ok(());
    }

    let interrupted =
        terminal::install_interrupt_flag().context("failed to install signal handlers")?;
    let (scheduler, fired) = ThreadScheduler::new();
    let mut player = Player::with_config(timeline, scheduler, &config);
    let mut sink = ReplaySink::new(!cli.no_thoughts, usize::from(terminal::columns()));

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut output = stdout.lock();
    let mut thoughts = stderr.lock();

    player.seek(cli.from);
    sink.sync(player.timeline(), player.current_time(), &mut output, &mut thoughts)?;
    player.play();

    while player.is_playing() {
        if interrupted.load(Ordering::Relaxed) {
            tracing::debug!(time = player.current_time(), "interrupted");
            break;
        }
        match fired.recv_timeout(INTERRUPT_POLL) {
            Ok(id) => {
                if player.on_timer(id) {
                    sink.sync(
                        player.timeline(),
                        player.current_time(),
                        &mut output,
                        &mut thoughts,
                    )?;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    player.shutdown();
    player.scheduler_mut().shutdown();
    write!(output, "{}", terminal::ANSI_RESET)?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}
