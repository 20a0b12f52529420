//! Read-side aggregation over settled bets, plus the leaderboard ordering.

use std::collections::BTreeMap;

use common::model::{Bet, BetStatus, User};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bilan {
    #[serde(rename = "totalBets")]
    pub total_bets: usize,
    #[serde(rename = "wonBets")]
    pub won_bets: usize,
    #[serde(rename = "lostBets")]
    pub lost_bets: usize,
    #[serde(rename = "netGains")]
    pub net_gains: i64,
    pub roi: f64,
}

/// Aggregate a user's settled bets: net gain is the sum of payouts on wins
/// minus stakes on losses; ROI is net gain over total staked on settled
/// bets, as a percentage rounded to 2 decimals (0 with no settled bets).
pub fn bilan(bets: &[Bet]) -> Bilan {
    let settled: Vec<&Bet> = bets.iter().filter(|b| b.status.is_settled()).collect();

    let won_bets = settled.iter().filter(|b| b.status == BetStatus::Won).count();
    let lost_bets = settled.len() - won_bets;

    let mut net_gains: i64 = 0;
    let mut total_staked: u64 = 0;
    for bet in &settled {
        total_staked += bet.stake;
        match bet.status {
            BetStatus::Won => net_gains += bet.payout,
            BetStatus::Lost => net_gains -= bet.stake as i64,
            BetStatus::Open => {}
        }
    }

    let roi = if total_staked > 0 {
        round2(net_gains as f64 / total_staked as f64 * 100.0)
    } else {
        0.0
    };

    Bilan {
        total_bets: settled.len(),
        won_bets,
        lost_bets,
        net_gains,
        roi,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub won: Vec<u32>,
    pub lost: Vec<u32>,
    pub settled: Vec<u32>,
    pub cumulative_pnl: Vec<i64>,
}

/// Per-day series over settled bets, keyed by placement date in ascending
/// order, with a running PnL total. Labels are `dd/mm`.
pub fn chart_data(bets: &[Bet]) -> ChartData {
    #[derive(Default)]
    struct DayStats {
        won: u32,
        lost: u32,
        settled: u32,
        pnl: i64,
    }

    let mut days: BTreeMap<chrono::NaiveDate, DayStats> = BTreeMap::new();
    for bet in bets.iter().filter(|b| b.status.is_settled()) {
        let day = days.entry(bet.placed_at.date_naive()).or_default();
        day.settled += 1;
        match bet.status {
            BetStatus::Won => {
                day.won += 1;
                day.pnl += bet.payout;
            }
            BetStatus::Lost => {
                day.lost += 1;
                day.pnl -= bet.stake as i64;
            }
            BetStatus::Open => {}
        }
    }

    let mut chart = ChartData {
        labels: Vec::new(),
        won: Vec::new(),
        lost: Vec::new(),
        settled: Vec::new(),
        cumulative_pnl: Vec::new(),
    };
    let mut running = 0;
    for (date, day) in days {
        chart.labels.push(date.format("%d/%m").to_string());
        chart.won.push(day.won);
        chart.lost.push(day.lost);
        chart.settled.push(day.settled);
        running += day.pnl;
        chart.cumulative_pnl.push(running);
    }
    chart
}

/// Top users by `(balance, level, xp)` descending.
pub fn leaderboard(users: &[User], limit: usize) -> Vec<&User> {
    let mut ranked: Vec<&User> = users.iter().collect();
    ranked.sort_by(|a, b| {
        (b.balance, b.level, b.xp).cmp(&(a.balance, a.level, a.xp))
    });
    ranked.truncate(limit);
    ranked
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
