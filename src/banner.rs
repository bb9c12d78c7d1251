//! Startup banner and console session summary.

use std::time::Duration;

use crate::consts::format_duration;

/// What to show at startup.
pub struct BannerInfo<'a> {
    pub mode: &'a str,
    pub worker: &'a str,
    pub pid: Option<u32>,
    /// Listen address; `None` in console mode.
    pub bind: Option<&'a str>,
    pub timeout: Duration,
}

pub fn banner_text(info: &BannerInfo) -> String {
    let pid = info
        .pid
        .map_or_else(|| "unknown".to_string(), |pid| pid.to_string());
    let mut text = format!(
        r#"
   ┌───────────────────────────────────────┐
   │           L I N E G A T E             │
   │    one line in, one line out          │
   └───────────────────────────────────────┘

   version   {}
   mode      {}
   worker    {} (pid {})
"#,
        env!("CARGO_PKG_VERSION"),
        info.mode,
        info.worker,
        pid,
    );
    if let Some(bind) = info.bind {
        text.push_str(&format!("   listen    http://{bind}\n"));
    }
    text.push_str(&format!("   timeout   {}\n", format_duration(info.timeout)));
    text
}

pub fn print_banner(info: &BannerInfo) {
    println!("{}", banner_text(info));
}

/// Print what a console session did, then say goodbye.
pub fn print_session_summary(sent: u64, failed: u64) {
    if sent > 0 {
        println!("session: {sent} command(s) sent, {failed} failed");
    }
    println!("goodbye.");
}
