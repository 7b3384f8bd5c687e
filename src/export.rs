use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct SquadRow<'a> {
    #[serde(rename = "Player")]
    player: &'a str,
    #[serde(rename = "Team")]
    team: &'a str,
    #[serde(rename = "Position")]
    position: &'static str,
    #[serde(rename = "Price")]
    price: String,
    #[serde(rename = "Total Points")]
    total_points: i32,
    #[serde(rename = "Form")]
    form: String,
    #[serde(rename = "xEfficiency")]
    x_efficiency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportReport {
    pub rows: usize,
    /// Picks with no matching player in the pool.
    pub skipped: usize,
}

pub fn report_file_name(date: NaiveDate) -> String {
    format!("xGAFFER_Squad_Report_{}.csv", date.format("%Y-%m-%d"))
}

/// Writes one row per squad pick, in pick order.
pub fn write_squad_csv<W: Write>(out: W, state: &AppState) -> Result<ExportReport> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(out);
    let mut report = ExportReport::default();
    for pick in &state.user_team.picks {
        let Some(p) = state.pool.get(pick.element) else {
            report.skipped += 1;
            continue;
        };
        writer.serialize(SquadRow {
            player: &p.web_name,
            team: state.club_name(p.team),
            position: p.position.short(),
            price: format!("{:.1}", p.now_cost.units()),
            total_points: p.total_points,
            form: p.form.map(|f| format!("{f:.1}")).unwrap_or_default(),
            x_efficiency: format!("{:.2}", p.derived.efficiency),
        })?;
        report.rows += 1;
    }
    writer.flush()?;
    Ok(report)
}

pub fn export_squad_csv(path: &Path, state: &AppState) -> Result<ExportReport> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    write_squad_csv(File::create(path)?, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Club, Delta, Money, Pick, Player, Position, apply_delta};

    fn state() -> AppState {
        let mut state = AppState::new();
        let player = Player {
            id: 10,
            web_name: "Saka".to_string(),
            team: 1,
            position: Position::Midfielder,
            now_cost: Money(100),
            total_points: 120,
            form: Some(7.0),
            selected_by_percent: Some(40.0),
            chance_of_playing_next_round: None,
            cost_change_event: 0,
            minutes: 1800,
            news: String::new(),
            difficulty: None,
            derived: Default::default(),
        };
        apply_delta(
            &mut state,
            Delta::Bootstrap {
                players: vec![player],
                clubs: vec![Club {
                    id: 1,
                    name: "Arsenal".to_string(),
                    short_name: "ARS".to_string(),
                }],
                events: Vec::new(),
            },
        );
        state.user_team.picks = vec![Pick::new(10, 1), Pick::new(99, 2)];
        state
    }

    #[test]
    fn writes_header_and_known_picks() {
        let mut buf = Vec::new();
        let report = write_squad_csv(&mut buf, &state()).unwrap();
        assert_eq!(report, ExportReport { rows: 1, skipped: 1 });
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Player,Team,Position,Price,Total Points,Form,xEfficiency")
        );
        assert_eq!(lines.next(), Some("Saka,Arsenal,MID,10.0,120,7.0,0.70"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn file_name_carries_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(report_file_name(date), "xGAFFER_Squad_Report_2026-03-14.csv");
    }
}
