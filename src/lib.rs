use std::time::Duration;

pub mod cleanup;
pub mod cmdline;
pub mod controls;
pub mod device;
pub mod drive;
pub mod error;
pub mod info;
pub mod logger;
pub mod playback;
pub mod player;
pub mod playlist;
pub mod score;
#[cfg(test)]
mod test_helpers;

/// Formats a song position as `HH:MM:SS`.
///
/// Milliseconds are appended as `HH:MM:SS.mmm` only when the position isn't a whole
/// number of seconds, so a remainder below one millisecond still shows up as `.000`.
pub fn format_position(position: Duration) -> String {
    let microseconds = position.as_micros();
    let seconds = microseconds / 1_000_000;
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let remaining_seconds = seconds % 60;
    let remaining_microseconds = microseconds % 1_000_000;
    if remaining_microseconds == 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, remaining_seconds)
    } else {
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            hours,
            minutes,
            remaining_seconds,
            remaining_microseconds / 1000
        )
    }
}
