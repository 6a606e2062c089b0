//! Cron-driven report runs.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::ReportError;
use crate::report::{ReportGenerator, ReportPeriod};

/// Parse a 6/7-field cron expression (seconds first).
pub fn parse_schedule(expr: &str) -> Result<Schedule, ReportError> {
    Schedule::from_str(expr).map_err(|e| ReportError::InvalidCron {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Next fire time after now.
pub fn next_fire(schedule: &Schedule) -> Option<DateTime<Utc>> {
    schedule.upcoming(Utc).next()
}

/// Run `run_once` at each fire time until Ctrl+C or the schedule runs out.
///
/// A failed run is logged; the schedule keeps going.
pub async fn run_scheduled(
    generator: &ReportGenerator,
    expr: &str,
    period: ReportPeriod,
    user_id: Option<&str>,
) -> Result<(), ReportError> {
    let schedule = parse_schedule(expr)?;
    tracing::info!(cron = %expr, period = %period, "Report scheduler started");

    while let Some(fire_at) = next_fire(&schedule) {
        let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();
        tracing::debug!(next = %fire_at, "Waiting for next report run");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, stopping report scheduler");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = generator.run_once(period, user_id).await {
                    tracing::error!(error = %e, "Scheduled report failed");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_fire_valid() {
        let schedule = parse_schedule("0 0 9 1 * *").unwrap();
        let next = next_fire(&schedule).unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn invalid_expression() {
        let err = parse_schedule("not a cron").unwrap_err();
        assert!(matches!(err, ReportError::InvalidCron { expr, .. } if expr == "not a cron"));
    }
}
