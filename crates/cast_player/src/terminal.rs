//! Process terminal helpers: width probing and interrupt handling.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};

pub const DEFAULT_COLUMNS: u16 = 80;
pub const ANSI_RESET: &str = "\x1b[0m";

#[cfg(unix)]
pub fn columns() -> u16 {
    read_winsize(libc::STDERR_FILENO)
        .or_else(|| read_winsize(libc::STDOUT_FILENO))
        .map(|(cols, _)| cols)
        .unwrap_or(DEFAULT_COLUMNS)
}

#[cfg(not(unix))]
pub fn columns() -> u16 {
    DEFAULT_COLUMNS
}

#[cfg(unix)]
fn read_winsize(fd: libc::c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}

/// Flag raised on SIGINT/SIGTERM. The replay loop polls it between ticks.
pub fn install_interrupt_flag() -> std::io::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&flag))?;
    }
    Ok(flag)
}
