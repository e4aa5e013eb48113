// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Format an uptime in seconds for display.
///
/// The largest non-zero unit leads and every smaller unit down to seconds
/// follows, even when zero:
///
/// ```
/// use status_client::presentation::format_uptime;
///
/// assert_eq!(format_uptime(59), "59 second(s)");
/// assert_eq!(format_uptime(86_460), "1 day(s) 0 hour(s) 1 minute(s) 0 second(s)");
/// ```
#[must_use]
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds / 3_600) % 24;
    let minutes = (seconds / 60) % 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{days} day(s) {hours} hour(s) {minutes} minute(s) {secs} second(s)")
    } else if hours > 0 {
        format!("{hours} hour(s) {minutes} minute(s) {secs} second(s)")
    } else if minutes > 0 {
        format!("{minutes} minute(s) {secs} second(s)")
    } else {
        format!("{secs} second(s)")
    }
}
