// ═══════════════════════════════════════════════════════════════════
// Service Tests: valuation, returns, projection, dividends,
// reconciliation, colors and analytics
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use std::collections::HashMap;

use portfolio_tracker_core::errors::CoreError;
use portfolio_tracker_core::models::market::{
    DividendPayment, DividendSeries, HistoricalPricePoint, HistoricalSeries, Quote,
};
use portfolio_tracker_core::models::notice::Notice;
use portfolio_tracker_core::models::position::{ImportRecord, Position, PositionPatch};
use portfolio_tracker_core::models::projection::{FinalValues, Projection, ProjectionMode};
use portfolio_tracker_core::models::settings::Annualization;
use portfolio_tracker_core::services::analytics_service::AnalyticsService;
use portfolio_tracker_core::services::color_service::{
    hsl_to_hex, position_color, random_color, PRESET_COLORS,
};
use portfolio_tracker_core::services::dividend_service::DividendService;
use portfolio_tracker_core::services::position_service::{PositionAction, PositionService};
use portfolio_tracker_core::services::projection_service::ProjectionService;
use portfolio_tracker_core::services::returns_service::ReturnsService;
use portfolio_tracker_core::services::valuation_service::ValuationService;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn quote(ticker: &str, price: Option<f64>, dividend_yield: Option<f64>, name: Option<&str>) -> Quote {
    Quote {
        ticker: ticker.into(),
        current_price: price,
        dividend_yield,
        name: name.map(String::from),
        error: None,
    }
}

/// `n` monthly closes, linear from `start` to `end`, starting January 2022.
fn monthly_series(n: usize, start: f64, end: f64) -> Vec<HistoricalPricePoint> {
    (0..n)
        .map(|i| {
            let close = if n > 1 {
                start + (end - start) * i as f64 / (n - 1) as f64
            } else {
                start
            };
            let year = 2022 + (i / 12) as i32;
            let month = (i % 12) as u32 + 1;
            HistoricalPricePoint::new(d(year, month, 1), close)
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════
//  Valuation
// ═══════════════════════════════════════════════════════════════════

mod valuation {
    use super::*;

    #[test]
    fn profit_loss_on_priced_position() {
        let svc = ValuationService::new();
        let p = Position::new("AAPL", 10.0, 100.0).with_current_price(150.0);
        assert_eq!(svc.value(&p), 1500.0);
        assert_eq!(svc.invested(&p), 1000.0);
        assert_eq!(svc.profit_loss(&p), 500.0);
        assert_eq!(svc.profit_loss_percent(&p), 50.0);
    }

    #[test]
    fn loss_is_negative() {
        let svc = ValuationService::new();
        let p = Position::new("AAPL", 4.0, 100.0).with_current_price(75.0);
        assert_eq!(svc.profit_loss(&p), -100.0);
        assert_eq!(svc.profit_loss_percent(&p), -25.0);
    }

    #[test]
    fn unknown_price_falls_back_to_buy_price() {
        let svc = ValuationService::new();
        let p = Position::new("AAPL", 10.0, 100.0);
        assert_eq!(svc.effective_price(&p), 100.0);
        assert_eq!(svc.value(&p), 1000.0);
        assert_eq!(svc.profit_loss(&p), 0.0);
    }

    #[test]
    fn zero_and_nan_prices_count_as_unknown() {
        let svc = ValuationService::new();
        let zero = Position::new("A", 2.0, 50.0).with_current_price(0.0);
        let nan = Position::new("B", 2.0, 50.0).with_current_price(f64::NAN);
        assert_eq!(svc.value(&zero), 100.0);
        assert_eq!(svc.value(&nan), 100.0);
    }

    #[test]
    fn zero_buy_price_gives_zero_percent() {
        let svc = ValuationService::new();
        let p = Position::new("GIFT", 10.0, 0.0).with_current_price(5.0);
        assert_eq!(svc.profit_loss(&p), 50.0);
        assert_eq!(svc.profit_loss_percent(&p), 0.0);
    }

    #[test]
    fn value_is_never_negative_for_non_negative_inputs() {
        let svc = ValuationService::new();
        for (qty, buy, current) in [
            (0.0, 0.0, None),
            (1.0, 0.0, Some(3.0)),
            (5.5, 12.0, Some(0.01)),
            (100.0, 1.0, None),
        ] {
            let mut p = Position::new("X", qty, buy);
            p.current_price = current;
            assert!(svc.value(&p) >= 0.0, "negative value for {p:?}");
        }
    }

    #[test]
    fn empty_totals_are_zero() {
        let totals = ValuationService::new().totals(&[]);
        assert_eq!(totals.total_value, 0.0);
        assert_eq!(totals.total_invested, 0.0);
        assert_eq!(totals.total_pl, 0.0);
        assert_eq!(totals.total_pl_percent, 0.0);
    }

    #[test]
    fn totals_sum_positions() {
        let positions = vec![
            Position::new("AAPL", 10.0, 100.0).with_current_price(150.0),
            Position::new("KO", 20.0, 50.0).with_current_price(45.0),
            Position::new("NEW", 1.0, 500.0),
        ];
        let totals = ValuationService::new().totals(&positions);
        assert_eq!(totals.total_value, 1500.0 + 900.0 + 500.0);
        assert_eq!(totals.total_invested, 1000.0 + 1000.0 + 500.0);
        assert_eq!(totals.total_pl, 400.0);
        assert!(approx(totals.total_pl_percent, 16.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Historical returns
// ═══════════════════════════════════════════════════════════════════

mod returns {
    use super::*;

    #[test]
    fn two_years_of_monthly_doubling() {
        let svc = ReturnsService::new(Annualization::default());
        let cagr = svc.historical_return(&monthly_series(24, 100.0, 200.0));
        assert!((cagr - 0.41421356).abs() < 1e-6, "cagr = {cagr}");
    }

    #[test]
    fn single_point_is_zero() {
        let svc = ReturnsService::new(Annualization::default());
        assert_eq!(svc.historical_return(&monthly_series(1, 100.0, 100.0)), 0.0);
        assert_eq!(svc.historical_return(&[]), 0.0);
    }

    #[test]
    fn non_positive_start_is_zero() {
        let svc = ReturnsService::new(Annualization::default());
        assert_eq!(svc.historical_return(&monthly_series(12, 0.0, 50.0)), 0.0);
        assert_eq!(svc.historical_return(&monthly_series(12, -5.0, 50.0)), 0.0);
    }

    #[test]
    fn negative_end_is_zero() {
        let svc = ReturnsService::new(Annualization::default());
        assert_eq!(svc.historical_return(&monthly_series(12, 10.0, -1.0)), 0.0);
    }

    #[test]
    fn total_loss_is_minus_one() {
        let svc = ReturnsService::new(Annualization::default());
        let cagr = svc.historical_return(&monthly_series(12, 10.0, 0.0));
        assert!(approx(cagr, -1.0));
    }

    #[test]
    fn non_finite_close_is_zero() {
        let svc = ReturnsService::new(Annualization::default());
        let mut series = monthly_series(12, 10.0, 20.0);
        series[11].close = f64::INFINITY;
        assert_eq!(svc.historical_return(&series), 0.0);
    }

    #[test]
    fn flat_series_is_zero() {
        let svc = ReturnsService::new(Annualization::default());
        assert!(approx(svc.historical_return(&monthly_series(36, 50.0, 50.0)), 0.0));
    }

    #[test]
    fn custom_samples_per_year() {
        // 4 quarterly samples = 1 year
        let svc = ReturnsService::new(Annualization::SampleCount { per_year: 4.0 });
        let cagr = svc.historical_return(&monthly_series(4, 100.0, 110.0));
        assert!(approx(cagr, 0.1));
    }

    #[test]
    fn date_span_annualization() {
        let svc = ReturnsService::new(Annualization::DateSpan);
        let series = vec![
            HistoricalPricePoint::new(d(2020, 1, 1), 100.0),
            HistoricalPricePoint::new(d(2022, 1, 1), 121.0),
        ];
        // 731 days ≈ 2.0014 years
        let cagr = svc.historical_return(&series);
        assert!((cagr - 0.1).abs() < 1e-3, "cagr = {cagr}");
    }

    #[test]
    fn date_span_same_day_uses_sample_count() {
        let svc = ReturnsService::new(Annualization::DateSpan);
        let series = vec![
            HistoricalPricePoint::new(d(2024, 1, 1), 100.0),
            HistoricalPricePoint::new(d(2024, 1, 1), 100.0),
        ];
        assert!(svc.historical_return(&series).is_finite());
    }

    #[test]
    fn returns_map_skips_empty_series() {
        let svc = ReturnsService::new(Annualization::default());
        let series = vec![
            HistoricalSeries {
                ticker: "aapl".into(),
                historical: monthly_series(24, 100.0, 200.0),
                error: None,
            },
            HistoricalSeries {
                ticker: "XXX".into(),
                historical: Vec::new(),
                error: Some("no data".into()),
            },
            HistoricalSeries {
                ticker: "ONE".into(),
                historical: monthly_series(1, 10.0, 10.0),
                error: None,
            },
        ];
        let map = svc.historical_returns(&series);
        assert_eq!(map.len(), 2);
        assert!(map["AAPL"] > 0.4);
        assert_eq!(map["ONE"], 0.0);
        assert!(!map.contains_key("XXX"));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Projection
// ═══════════════════════════════════════════════════════════════════

mod projection {
    use super::*;

    fn portfolio() -> (Vec<Position>, HashMap<String, f64>) {
        let positions = vec![
            Position::new("AAPL", 10.0, 100.0)
                .with_current_price(150.0)
                .with_dividend_yield(2.0),
            Position::new("KO", 20.0, 50.0).with_current_price(60.0),
        ];
        let mut returns = HashMap::new();
        returns.insert("AAPL".to_string(), 0.10);
        returns.insert("KO".to_string(), 0.05);
        (positions, returns)
    }

    #[test]
    fn aggregated_year_zero_is_total_value() {
        let (positions, returns) = portfolio();
        let total = ValuationService::new().totals(&positions).total_value;
        let rows = ProjectionService::new().project_aggregated(&positions, &returns, 10);

        assert_eq!(rows.len(), 11);
        assert_eq!(rows[0].year, 0);
        assert_eq!(rows[0].with_dividends, total);
        assert_eq!(rows[0].without_dividends, total);
        assert_eq!(rows[10].year, 10);
    }

    #[test]
    fn aggregated_compounding() {
        let (positions, returns) = portfolio();
        let rows = ProjectionService::new().project_aggregated(&positions, &returns, 2);

        // AAPL 1500 at 10% (12% with dividends), KO 1200 at 5%
        assert!(approx(rows[1].without_dividends, 1500.0 * 1.10 + 1200.0 * 1.05));
        assert!(approx(rows[1].with_dividends, 1500.0 * 1.12 + 1200.0 * 1.05));
        assert!(approx(
            rows[2].with_dividends,
            1500.0 * 1.12 * 1.12 + 1200.0 * 1.05 * 1.05
        ));
    }

    #[test]
    fn with_dividends_never_below_without_for_positive_yields() {
        let (positions, returns) = portfolio();
        for row in ProjectionService::new().project_aggregated(&positions, &returns, 30) {
            assert!(row.with_dividends >= row.without_dividends);
        }
    }

    #[test]
    fn detailed_year_zero_matches_aggregated() {
        let (positions, returns) = portfolio();
        let svc = ProjectionService::new();
        let aggregated = svc.project_aggregated(&positions, &returns, 5);
        let detailed = svc.project_detailed(&positions, &returns, 5);

        assert_eq!(detailed.len(), 6);
        assert!(approx(detailed[0].total(), aggregated[0].without_dividends));
        assert_eq!(detailed[0].values["AAPL"], 1500.0);
        assert_eq!(detailed[0].values["KO"], 1200.0);
    }

    #[test]
    fn detailed_ignores_dividends() {
        let (positions, returns) = portfolio();
        let svc = ProjectionService::new();
        let aggregated = svc.project_aggregated(&positions, &returns, 3);
        let detailed = svc.project_detailed(&positions, &returns, 3);
        for (a, d) in aggregated.iter().zip(&detailed) {
            assert!(approx(a.without_dividends, d.total()));
        }
    }

    #[test]
    fn missing_return_grows_at_zero() {
        let positions = vec![Position::new("NEW", 2.0, 100.0)];
        let rows = ProjectionService::new().project_aggregated(&positions, &HashMap::new(), 4);
        assert!(rows.iter().all(|r| r.without_dividends == 200.0));
        assert!(rows.iter().all(|r| r.with_dividends == 200.0));
    }

    #[test]
    fn non_finite_return_treated_as_zero() {
        let positions = vec![Position::new("BAD", 1.0, 100.0)];
        let mut returns = HashMap::new();
        returns.insert("BAD".to_string(), f64::NAN);
        let rows = ProjectionService::new().project_detailed(&positions, &returns, 2);
        assert_eq!(rows[2].values["BAD"], 100.0);
    }

    #[test]
    fn zero_horizon_has_one_row() {
        let (positions, returns) = portfolio();
        let projection =
            ProjectionService::new().project(&positions, &returns, 0, ProjectionMode::Detailed);
        assert_eq!(projection.len(), 1);
    }

    #[test]
    fn empty_portfolio_projects_zeros() {
        let rows = ProjectionService::new().project_aggregated(&[], &HashMap::new(), 3);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.with_dividends == 0.0));
    }

    #[test]
    fn deterministic() {
        let (positions, returns) = portfolio();
        let svc = ProjectionService::new();
        let a = svc.project(&positions, &returns, 15, ProjectionMode::Aggregated);
        let b = svc.project(&positions, &returns, 15, ProjectionMode::Aggregated);
        assert_eq!(a, b);
    }

    #[test]
    fn final_values() {
        let (positions, returns) = portfolio();
        let svc = ProjectionService::new();

        let aggregated = svc.project(&positions, &returns, 1, ProjectionMode::Aggregated);
        match svc.final_values(&aggregated) {
            Some(FinalValues::Aggregated {
                with_dividends,
                without_dividends,
            }) => {
                assert!(approx(without_dividends, 1500.0 * 1.10 + 1200.0 * 1.05));
                assert!(with_dividends > without_dividends);
            }
            other => panic!("unexpected final values {other:?}"),
        }

        let detailed = svc.project(&positions, &returns, 1, ProjectionMode::Detailed);
        assert!(matches!(
            svc.final_values(&detailed),
            Some(FinalValues::Detailed { .. })
        ));
        assert_eq!(svc.final_values(&Projection::Detailed(Vec::new())), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Dividends
// ═══════════════════════════════════════════════════════════════════

mod dividends {
    use super::*;

    fn series(ticker: &str, payments: &[(NaiveDate, f64)]) -> DividendSeries {
        DividendSeries {
            ticker: ticker.into(),
            dividends: payments
                .iter()
                .map(|(date, amount)| DividendPayment::new(*date, *amount))
                .collect(),
            error: None,
        }
    }

    #[test]
    fn amount_scales_with_quantity() {
        let svc = DividendService::new();
        let positions = vec![Position::new("KO", 50.0, 55.0).with_name("Coca-Cola")];
        let events = svc.build_events(&[series("KO", &[(d(2024, 3, 1), 1.0)])], &positions);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amount, 50.0);
        assert_eq!(events[0].name, "Coca-Cola");
        assert_eq!(svc.events_by_year(&events, 2024).len(), 1);
        assert!(svc.events_by_year(&events, 2023).is_empty());
    }

    #[test]
    fn unmatched_tickers_are_dropped() {
        let svc = DividendService::new();
        let positions = vec![Position::new("KO", 1.0, 55.0)];
        let events = svc.build_events(
            &[
                series("KO", &[(d(2024, 3, 1), 0.5)]),
                series("PEP", &[(d(2024, 3, 2), 1.2)]),
            ],
            &positions,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ticker, "KO");
    }

    #[test]
    fn name_falls_back_to_ticker() {
        let svc = DividendService::new();
        let events = svc.build_events(
            &[series("ko", &[(d(2024, 3, 1), 0.5)])],
            &[Position::new("KO", 2.0, 55.0)],
        );
        assert_eq!(events[0].name, "KO");
        assert_eq!(events[0].ticker, "KO");
    }

    #[test]
    fn events_sorted_by_date_then_ticker() {
        let svc = DividendService::new();
        let positions = vec![Position::new("KO", 1.0, 1.0), Position::new("AAPL", 1.0, 1.0)];
        let events = svc.build_events(
            &[
                series("KO", &[(d(2024, 6, 1), 1.0), (d(2024, 1, 1), 1.0)]),
                series("AAPL", &[(d(2024, 6, 1), 1.0)]),
            ],
            &positions,
        );
        let order: Vec<(NaiveDate, &str)> =
            events.iter().map(|e| (e.date, e.ticker.as_str())).collect();
        assert_eq!(
            order,
            vec![
                (d(2024, 1, 1), "KO"),
                (d(2024, 6, 1), "AAPL"),
                (d(2024, 6, 1), "KO"),
            ]
        );
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let svc = DividendService::new();
        let data = vec![series("KO", &[(d(2024, 3, 1), 0.5), (d(2024, 6, 1), 0.5)])];
        let positions = vec![Position::new("KO", 10.0, 55.0)];
        assert_eq!(
            svc.build_events(&data, &positions),
            svc.build_events(&data, &positions)
        );
    }

    #[test]
    fn events_follow_quantity_changes() {
        let svc = DividendService::new();
        let data = vec![series("KO", &[(d(2024, 3, 1), 0.5)])];
        let before = svc.build_events(&data, &[Position::new("KO", 10.0, 55.0)]);
        let after = svc.build_events(&data, &[Position::new("KO", 30.0, 55.0)]);
        assert_eq!(before[0].amount, 5.0);
        assert_eq!(after[0].amount, 15.0);
    }

    #[test]
    fn summary_and_year_total() {
        let svc = DividendService::new();
        let positions = vec![Position::new("KO", 10.0, 55.0)];
        let events = svc.build_events(
            &[series(
                "KO",
                &[(d(2023, 12, 1), 0.4), (d(2024, 3, 1), 0.5), (d(2024, 6, 1), 0.5)],
            )],
            &positions,
        );
        let summary = svc.summary(&events);
        assert!(approx(summary.total_amount, 14.0));
        assert_eq!(summary.total_payments, 3);
        assert_eq!(summary.last_payment_date, Some(d(2024, 6, 1)));
        assert!(approx(svc.year_total(&events, 2024), 10.0));
        assert!(approx(svc.year_total(&events, 2023), 4.0));
        assert_eq!(svc.year_total(&events, 2022), 0.0);
    }

    #[test]
    fn empty_summary() {
        let summary = DividendService::new().summary(&[]);
        assert_eq!(summary.total_amount, 0.0);
        assert_eq!(summary.total_payments, 0);
        assert_eq!(summary.last_payment_date, None);
    }

    #[test]
    fn monthly_totals_have_twelve_rows() {
        let svc = DividendService::new();
        let positions = vec![Position::new("KO", 2.0, 55.0), Position::new("AAPL", 1.0, 1.0)];
        let events = svc.build_events(
            &[
                series("KO", &[(d(2024, 3, 1), 0.5), (d(2024, 3, 20), 0.25)]),
                series("AAPL", &[(d(2024, 12, 15), 0.24), (d(2025, 1, 15), 0.25)]),
            ],
            &positions,
        );
        let months = svc.monthly_totals(&events, 2024);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].month, 1);
        assert_eq!(months[0].total, 0.0);
        assert!(approx(months[2].total, 1.5));
        assert!(approx(months[11].total, 0.24));
    }

    #[test]
    fn events_by_day_groups_a_month() {
        let svc = DividendService::new();
        let positions = vec![Position::new("KO", 1.0, 1.0), Position::new("PEP", 1.0, 1.0)];
        let events = svc.build_events(
            &[
                series("KO", &[(d(2024, 3, 1), 0.5), (d(2024, 4, 1), 0.5)]),
                series("PEP", &[(d(2024, 3, 1), 1.2), (d(2024, 3, 28), 1.2)]),
            ],
            &positions,
        );
        let days = svc.events_by_day(&events, 2024, 3);
        assert_eq!(days.len(), 2);
        assert_eq!(days[&d(2024, 3, 1)].len(), 2);
        assert_eq!(days[&d(2024, 3, 28)].len(), 1);
    }

    #[test]
    fn ticker_histories() {
        let svc = DividendService::new();
        let mut ko = series("ko", &[(d(2024, 6, 1), 0.5), (d(2023, 6, 1), 0.46)]);
        ko.dividends[0].r#yield = Some(0.8);
        ko.dividends[1].r#yield = Some(0.7);
        let histories = svc.ticker_histories(&[ko, series("BRK", &[])]);

        assert_eq!(histories[0].ticker, "KO");
        assert_eq!(histories[0].payments, 2);
        assert_eq!(histories[0].first_payment, Some(d(2023, 6, 1)));
        assert_eq!(histories[0].last_payment, Some(d(2024, 6, 1)));
        assert!(approx(histories[0].average_yield.unwrap(), 0.75));
        assert_eq!(histories[1].payments, 0);
        assert_eq!(histories[1].average_yield, None);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Position reconciliation
// ═══════════════════════════════════════════════════════════════════

mod reconciliation {
    use super::*;

    #[test]
    fn upsert_appends_new_ticker() {
        let svc = PositionService::new();
        let state = svc.reduce(&[], PositionAction::Upsert(Position::new("AAPL", 1.0, 100.0)));
        let state = svc.reduce(&state, PositionAction::Upsert(Position::new("KO", 1.0, 50.0)));
        assert_eq!(svc.tickers(&state), vec!["AAPL", "KO"]);
    }

    #[test]
    fn upsert_twice_keeps_one_entry_in_place() {
        let svc = PositionService::new();
        let state = vec![
            Position::new("AAPL", 1.0, 100.0),
            Position::new("KO", 1.0, 50.0),
            Position::new("MSFT", 1.0, 300.0),
        ];
        let mut replacement = Position::new("ko", 25.0, 52.0);
        replacement.name = Some("Coca-Cola".into());
        let next = svc.reduce(&state, PositionAction::Upsert(replacement));

        assert_eq!(next.len(), 3);
        assert_eq!(next[1].ticker, "KO");
        assert_eq!(next[1].quantity, 25.0);
        assert_eq!(next[1].name.as_deref(), Some("Coca-Cola"));
        assert_eq!(next[2].ticker, "MSFT");
    }

    #[test]
    fn reduce_does_not_touch_input() {
        let svc = PositionService::new();
        let state = vec![Position::new("AAPL", 1.0, 100.0)];
        let _ = svc.reduce(&state, PositionAction::Remove("AAPL".into()));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn upsert_many_deduplicates() {
        let svc = PositionService::new();
        let next = svc.reduce(
            &[],
            PositionAction::UpsertMany(vec![
                Position::new("AAPL", 1.0, 100.0),
                Position::new("KO", 1.0, 50.0),
                Position::new("aapl", 3.0, 110.0),
            ]),
        );
        assert_eq!(next.len(), 2);
        assert_eq!(next[0].quantity, 3.0);
    }

    #[test]
    fn remove_is_case_insensitive() {
        let svc = PositionService::new();
        let state = vec![Position::new("AAPL", 1.0, 100.0), Position::new("KO", 1.0, 50.0)];
        let next = svc.reduce(&state, PositionAction::Remove(" aapl".into()));
        assert_eq!(svc.tickers(&next), vec!["KO"]);
        let unchanged = svc.reduce(&next, PositionAction::Remove("NOPE".into()));
        assert_eq!(unchanged, next);
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let svc = PositionService::new();
        let state = vec![Position::new("AAPL", 1.0, 100.0).with_color("#3b82f6")];
        let next = svc.reduce(
            &state,
            PositionAction::Patch {
                ticker: "AAPL".into(),
                patch: PositionPatch {
                    quantity: Some(4.0),
                    ..Default::default()
                },
            },
        );
        assert_eq!(next[0].quantity, 4.0);
        assert_eq!(next[0].buy_price, 100.0);
        assert_eq!(next[0].color.as_deref(), Some("#3b82f6"));
    }

    #[test]
    fn apply_quotes_merges_usable_quotes_only() {
        let svc = PositionService::new();
        let state = vec![
            Position::new("AAPL", 1.0, 100.0).with_dividend_yield(0.5),
            Position::new("KO", 1.0, 50.0).with_current_price(60.0),
            Position::new("MSFT", 1.0, 300.0),
        ];
        let mut broken = quote("KO", Some(61.0), None, None);
        broken.error = Some("rate limited".into());
        let next = svc.reduce(
            &state,
            PositionAction::ApplyQuotes(vec![
                quote("aapl", Some(190.0), Some(0.0), Some("Apple Inc.")),
                broken,
                quote("MSFT", Some(0.0), Some(0.8), None),
            ]),
        );

        assert_eq!(next[0].current_price, Some(190.0));
        // zero yield keeps the old one
        assert_eq!(next[0].dividend_yield, Some(0.5));
        assert_eq!(next[0].name.as_deref(), Some("Apple Inc."));
        assert_eq!(next[1].current_price, Some(60.0));
        assert_eq!(next[2].current_price, None);
        assert_eq!(next[2].dividend_yield, None);
    }

    #[test]
    fn replace_swaps_list() {
        let svc = PositionService::new();
        let state = vec![Position::new("AAPL", 1.0, 100.0)];
        let next = svc.reduce(
            &state,
            PositionAction::Replace(vec![Position::new("ko", 1.0, 50.0)]),
        );
        assert_eq!(svc.tickers(&next), vec!["KO"]);
    }

    #[test]
    fn enrich_with_usable_quote() {
        let svc = PositionService::new();
        let draft = Position::new("AAPL", 10.0, 150.0);
        let (position, notice) = svc.enrich(
            draft,
            Some(&quote("AAPL", Some(190.0), Some(0.5), Some("Apple Inc."))),
        );
        assert!(notice.is_none());
        assert_eq!(position.current_price, Some(190.0));
        assert_eq!(position.dividend_yield, Some(0.5));
        assert_eq!(position.name.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn enrich_without_quote_falls_back() {
        let svc = PositionService::new();
        let draft = Position::new("XXX", 10.0, 150.0).with_name("Mystery");
        let (position, notice) = svc.enrich(draft, None);
        assert_eq!(position.current_price, None);
        assert_eq!(position.name.as_deref(), Some("Mystery"));
        assert_eq!(ValuationService::new().value(&position), 1500.0);
        assert!(matches!(
            notice,
            Some(Notice::QuoteUnavailable { ref ticker, .. }) if ticker == "XXX"
        ));
    }

    #[test]
    fn enrich_reports_quote_error() {
        let svc = PositionService::new();
        let mut q = quote("XXX", None, None, None);
        q.error = Some("Ticker not found".into());
        let (_, notice) = svc.enrich(Position::new("XXX", 1.0, 1.0), Some(&q));
        match notice {
            Some(Notice::QuoteUnavailable { reason, .. }) => assert_eq!(reason, "Ticker not found"),
            other => panic!("unexpected notice {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let svc = PositionService::new();
        assert!(svc.validate(&Position::new("AAPL", 1.0, 0.0)).is_ok());
        assert!(svc.validate(&Position::new("  ", 1.0, 1.0)).is_err());
        assert!(svc.validate(&Position::new("AAPL", 0.0, 1.0)).is_err());
        assert!(svc.validate(&Position::new("AAPL", 1.0, -1.0)).is_err());
        assert!(svc.validate(&Position::new("AAPL", f64::NAN, 1.0)).is_err());
        assert!(svc
            .validate(&Position::new("ABCDEFGHIJKLMNOPQRSTUVWXYZ", 1.0, 1.0))
            .is_err());
    }

    #[test]
    fn validate_patch() {
        let svc = PositionService::new();
        assert!(svc.validate_patch(&PositionPatch::default()).is_err());
        assert!(svc
            .validate_patch(&PositionPatch {
                quantity: Some(-1.0),
                ..Default::default()
            })
            .is_err());
        assert!(svc
            .validate_patch(&PositionPatch {
                buy_price: Some(0.0),
                ..Default::default()
            })
            .is_ok());
    }

    #[test]
    fn fingerprint_ignores_order() {
        let svc = PositionService::new();
        let a = vec![Position::new("KO", 1.0, 1.0), Position::new("AAPL", 1.0, 1.0)];
        let b = vec![Position::new("AAPL", 2.0, 1.0), Position::new("KO", 5.0, 1.0)];
        assert_eq!(svc.fingerprint(&a), "AAPL,KO");
        assert_eq!(svc.fingerprint(&a), svc.fingerprint(&b));
        assert_eq!(svc.fingerprint(&[]), "");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Import / export parsing
// ═══════════════════════════════════════════════════════════════════

mod import {
    use super::*;

    #[test]
    fn parses_valid_document() {
        let svc = PositionService::new();
        let records = svc
            .parse_import(
                r##"[
                    {"ticker": "aapl", "quantity": 10, "buyPrice": 150.0, "color": "#3b82f6"},
                    {"ticker": "KO", "quantity": 5.5, "buyPrice": 55}
                ]"##,
            )
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ticker, "AAPL");
        assert_eq!(records[1].color, None);
    }

    #[test]
    fn empty_array_is_fine() {
        assert!(PositionService::new().parse_import("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_object() {
        let err = PositionService::new()
            .parse_import(r#"{"ticker": "AAPL", "quantity": 1, "buyPrice": 1}"#)
            .unwrap_err();
        match err {
            CoreError::Import(msg) => assert!(msg.contains("found an object"), "{msg}"),
            other => panic!("Expected Import, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_json() {
        let err = PositionService::new().parse_import("[{").unwrap_err();
        assert!(matches!(err, CoreError::Import(msg) if msg.starts_with("Invalid JSON")));
    }

    #[test]
    fn one_bad_record_rejects_everything() {
        let err = PositionService::new()
            .parse_import(
                r#"[
                    {"ticker": "AAPL", "quantity": 10, "buyPrice": 150.0},
                    {"ticker": "KO", "quantity": -5, "buyPrice": 55}
                ]"#,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Import(msg) if msg.starts_with("Record 1")));
    }

    #[test]
    fn missing_field_rejected() {
        let err = PositionService::new()
            .parse_import(r#"[{"ticker": "AAPL", "quantity": 10}]"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::Import(_)));
    }

    #[test]
    fn drafts_get_colors() {
        let svc = PositionService::new();
        let records = vec![
            ImportRecord {
                ticker: "AAPL".into(),
                quantity: 1.0,
                buy_price: 1.0,
                color: Some("#10b981".into()),
                name: None,
            },
            ImportRecord {
                ticker: "KO".into(),
                quantity: 1.0,
                buy_price: 1.0,
                color: None,
                name: Some("Coca-Cola".into()),
            },
        ];
        let drafts = svc.drafts_from_records(&records);
        assert_eq!(drafts[0].color.as_deref(), Some("#10b981"));
        let generated = drafts[1].color.as_deref().unwrap();
        assert!(generated.starts_with('#') && generated.len() == 7);
        assert_eq!(drafts[1].name.as_deref(), Some("Coca-Cola"));
        assert!(drafts.iter().all(|p| p.current_price.is_none()));
    }

    #[test]
    fn export_matches_import_format() {
        let svc = PositionService::new();
        let positions = vec![Position::new("AAPL", 10.0, 150.0)
            .with_current_price(190.0)
            .with_color("#3b82f6")];
        let json = serde_json::to_string(&svc.export(&positions)).unwrap();
        let back = svc.parse_import(&json).unwrap();
        assert_eq!(back[0].ticker, "AAPL");
        assert_eq!(back[0].quantity, 10.0);
        assert!(!json.contains("currentPrice"));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Colors
// ═══════════════════════════════════════════════════════════════════

mod colors {
    use super::*;

    #[test]
    fn own_color_wins() {
        let p = Position::new("AAPL", 1.0, 1.0).with_color("#123456");
        assert_eq!(position_color(&p, 0), "#123456");
    }

    #[test]
    fn preset_by_index() {
        let p = Position::new("AAPL", 1.0, 1.0);
        assert_eq!(position_color(&p, 0), PRESET_COLORS[0]);
        assert_eq!(position_color(&p, 7), PRESET_COLORS[7]);
    }

    #[test]
    fn random_beyond_presets() {
        let p = Position::new("AAPL", 1.0, 1.0);
        let color = position_color(&p, 8);
        assert_eq!(color.len(), 7);
        assert!(color.starts_with('#'));
    }

    #[test]
    fn random_color_is_hex() {
        for _ in 0..50 {
            let color = random_color();
            assert_eq!(color.len(), 7);
            assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()), "{color}");
        }
    }

    #[test]
    fn hsl_conversion() {
        assert_eq!(hsl_to_hex(0.0, 100.0, 50.0), "#ff0000");
        assert_eq!(hsl_to_hex(120.0, 100.0, 50.0), "#00ff00");
        assert_eq!(hsl_to_hex(240.0, 100.0, 50.0), "#0000ff");
        assert_eq!(hsl_to_hex(0.0, 0.0, 100.0), "#ffffff");
        assert_eq!(hsl_to_hex(360.0, 100.0, 50.0), "#ff0000");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Analytics
// ═══════════════════════════════════════════════════════════════════

mod analytics {
    use super::*;

    #[test]
    fn allocation_percentages() {
        let positions = vec![
            Position::new("AAPL", 10.0, 100.0).with_current_price(150.0),
            Position::new("KO", 10.0, 50.0),
        ];
        let slices = AnalyticsService::new().allocation(&positions);
        assert_eq!(slices.len(), 2);
        assert!(approx(slices[0].percent, 75.0));
        assert!(approx(slices[1].percent, 25.0));
        assert_eq!(slices[1].color, PRESET_COLORS[1]);
    }

    #[test]
    fn allocation_of_worthless_portfolio() {
        let positions = vec![Position::new("FREE", 10.0, 0.0)];
        let slices = AnalyticsService::new().allocation(&positions);
        assert_eq!(slices[0].percent, 0.0);
    }

    #[test]
    fn performance_series_relative_to_first_close() {
        let positions = vec![Position::new("AAPL", 1.0, 1.0), Position::new("KO", 1.0, 1.0)];
        let mut historical = HashMap::new();
        historical.insert(
            "AAPL".to_string(),
            vec![
                HistoricalPricePoint::new(d(2024, 1, 1), 100.0),
                HistoricalPricePoint::new(d(2024, 2, 1), 110.0),
            ],
        );
        historical.insert(
            "KO".to_string(),
            vec![HistoricalPricePoint::new(d(2024, 2, 1), 50.0)],
        );

        let series = AnalyticsService::new().performance_series(&positions, &historical);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, d(2024, 1, 1));
        assert_eq!(series[0].changes["AAPL"], 0.0);
        assert!(!series[0].changes.contains_key("KO"));
        assert!(approx(series[1].changes["AAPL"], 10.0));
        assert_eq!(series[1].changes["KO"], 0.0);
    }

    #[test]
    fn performance_skips_zero_first_close() {
        let positions = vec![Position::new("ZERO", 1.0, 1.0)];
        let mut historical = HashMap::new();
        historical.insert(
            "ZERO".to_string(),
            vec![
                HistoricalPricePoint::new(d(2024, 1, 1), 0.0),
                HistoricalPricePoint::new(d(2024, 2, 1), 5.0),
            ],
        );
        assert!(AnalyticsService::new()
            .performance_series(&positions, &historical)
            .is_empty());
    }
}
