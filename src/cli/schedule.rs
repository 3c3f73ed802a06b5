//! Schedule command implementation

use crate::clock::{Clock, SystemClock};
use crate::schedule::ScheduleTable;

pub fn run(schedule: &ScheduleTable) {
    let now = SystemClock.now();
    let active = schedule.current_block(now).map(|b| b.hour);

    println!("Reference time zone: {}", schedule.calendar().tz());
    println!("{:<3} {:<7} {:<5} {}", "", "Hour", "Zone", "Block");
    println!("{}", "-".repeat(40));
    for block in schedule.blocks() {
        let marker = if active == Some(block.hour) { "▶" } else { "" };
        println!(
            "{:<3} {:<7} {:<5} {}",
            marker,
            format!("{:02}:00", block.hour),
            block.zone.as_str(),
            block.label
        );
    }
    if active.is_none() {
        println!("\nNo calling block active right now.");
    }
}
