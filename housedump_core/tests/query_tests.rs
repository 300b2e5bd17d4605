use chrono::NaiveDate;
use housedump_core::{
    M2_PER_PING, NEW_TAIPEI, QueryError, QueryFilter, Table, ValuationRequest,
    core::valuation::BaselineType,
    core::features::risk_from_age,
    ingest,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sql_value(value: Option<f64>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}

// One tuple in the default fifteen-column order.
fn tuple(date: &str, district: &str, usage: &str, price: Option<f64>, risk: Option<f64>) -> String {
    format!(
        "('{}',NULL,NULL,'新北市','{}',NULL,NULL,NULL,NULL,{},NULL,'{}',NULL,NULL,{})",
        date,
        district,
        sql_value(price),
        usage,
        sql_value(risk)
    )
}

fn table(tuples: &[String]) -> Table {
    let dump = format!("INSERT INTO `houses` VALUES {};", tuples.join(",\n"));
    let outcome = ingest(&dump);
    assert_eq!(outcome.report.rows_loaded, tuples.len());
    outcome.table
}

fn three_prices() -> Table {
    table(&[
        tuple("2023-01-10", "板橋", "住家用", Some(300.0), Some(0.0)),
        tuple("2023-02-10", "板橋區", "住家用", Some(100.0), Some(0.0)),
        tuple("2023-03-10", "Banqiao", "住宅", Some(200.0), Some(0.0)),
        tuple("2023-03-11", "三重區", "住家用", Some(900.0), Some(0.0)),
    ])
}

#[test]
fn adjusted_valuation_uses_the_median() {
    let table = three_prices();
    let request = ValuationRequest::new(NEW_TAIPEI, "板橋區", 33.0);
    let result = table.valuation(&request).unwrap();

    let expected = 200.0 * 33.0 / M2_PER_PING;
    assert_eq!(result.baseline_type, BaselineType::AdjustedMedian);
    assert_eq!(result.baseline_pp_ping, 200.0);
    assert!((result.est_total - expected).abs() < 1e-9);
    assert!((result.est_total - 1996.5).abs() < 0.1);
    assert_eq!(result.est_range_lo, result.est_total * 0.9);
    assert_eq!(result.est_range_hi, result.est_total * 1.1);
    assert_eq!(result.applied_risk_factor, None);
    assert_eq!(result.sample_size, 3);
    assert_eq!(result.cut_to, day(2023, 3, 10));
    assert_eq!(result.cut_from, day(2021, 3, 10));
    assert!(!result.used_fallback);

    let rounded = result.rounded();
    assert_eq!(rounded.est_total, 1997.0);
    assert_eq!(rounded.area_ping, 9.98);
}

#[test]
fn raw_valuation_applies_the_callers_age() {
    let table = three_prices();
    let request = ValuationRequest::new(NEW_TAIPEI, "板橋區", 33.0)
        .raw_baseline()
        .age_years(10.0);
    let result = table.valuation(&request).unwrap();

    let risk = risk_from_age(Some(10.0));
    assert_eq!(result.baseline_type, BaselineType::RawMedian);
    assert_eq!(result.applied_risk_factor, Some(risk));
    let expected = 200.0 * (1.0 - risk) * 33.0 / M2_PER_PING;
    assert!((result.est_total - expected).abs() < 1e-9);
}

#[test]
fn valuation_falls_back_to_the_wider_window() {
    let table = table(&[
        tuple("2021-02-01", "新店區", "住家用", Some(400000.0), Some(0.1)),
        tuple("2021-02-03", "新店區", "住家用", Some(420000.0), Some(0.1)),
    ]);
    let as_of = day(2024, 6, 1);

    let request = ValuationRequest::new(NEW_TAIPEI, "新店區", 66.0)
        .as_of(as_of)
        .window_months(24)
        .fallback_months(60);
    let result = table.valuation(&request).unwrap();
    assert!(result.used_fallback);
    assert_eq!(result.cut_from, day(2019, 6, 1));
    assert_eq!(result.cut_to, as_of);
    assert_eq!(result.sample_size, 2);
    assert!((result.baseline_pp_ping - 369000.0).abs() < 1e-6);

    let no_fallback = request.clone().fallback_months(0);
    let err = table.valuation(&no_fallback).unwrap_err();
    assert!(err.is_no_data());
    assert_eq!(
        err,
        QueryError::NoDataInWindow {
            from: day(2022, 6, 1),
            to: as_of
        }
    );
}

#[test]
fn as_of_excludes_later_transactions() {
    let table = table(&[
        tuple("2020-01-01", "新店區", "住家用", Some(100.0), Some(0.0)),
        tuple("2024-01-01", "新店區", "住家用", Some(900.0), Some(0.0)),
    ]);
    let request = ValuationRequest::new(NEW_TAIPEI, "新店區", 33.0).as_of(day(2021, 1, 1));
    let result = table.valuation(&request).unwrap();
    assert_eq!(result.baseline_pp_ping, 100.0);
    assert_eq!(result.sample_size, 1);

    let before_everything = request.as_of(day(2019, 1, 1));
    assert_eq!(table.valuation(&before_everything), Err(QueryError::NoData));
}

#[test]
fn valuation_errors() {
    let table = table(&[
        tuple("2023-01-01", "汐止區", "住家用", None, None),
        tuple("not a date", "林口區", "住家用", Some(1.0), None),
    ]);

    let unknown = ValuationRequest::new(NEW_TAIPEI, "烏來區", 33.0);
    assert!(matches!(
        table.valuation(&unknown),
        Err(QueryError::NoRegion { .. })
    ));

    let office = ValuationRequest::new(NEW_TAIPEI, "汐止區", 33.0).usage("辦公用");
    assert!(matches!(
        table.valuation(&office),
        Err(QueryError::NoRegion { .. })
    ));

    let no_prices = ValuationRequest::new(NEW_TAIPEI, "汐止區", 33.0);
    assert_eq!(
        table.valuation(&no_prices),
        Err(QueryError::NoBaseline(BaselineType::AdjustedMedian))
    );
    assert_eq!(
        table.valuation(&no_prices.clone().raw_baseline()),
        Err(QueryError::NoBaseline(BaselineType::RawMedian))
    );

    let undated = ValuationRequest::new(NEW_TAIPEI, "林口區", 33.0);
    assert_eq!(table.valuation(&undated), Err(QueryError::NoData));
}

#[test]
fn aggregation_conserves_counts() {
    let mut rng = StdRng::seed_from_u64(7);
    let districts = ["板橋區", "三重區", "永和區"];
    let tuples: Vec<String> = (0..300)
        .map(|_| {
            let date = if rng.random_bool(0.1) {
                "unknown".to_string()
            } else {
                format!(
                    "{}-{:02}-{:02}",
                    rng.random_range(2018..2024),
                    rng.random_range(1..=12),
                    rng.random_range(1..=28)
                )
            };
            let price = rng.random_bool(0.8).then(|| rng.random_range(200_000..900_000) as f64);
            let district = districts[rng.random_range(0..districts.len())];
            tuple(&date, district, "住家用", price, None)
        })
        .collect();
    let table = table(&tuples);

    for filter in [
        QueryFilter::new(),
        QueryFilter::new().city(NEW_TAIPEI).district("三重區"),
        QueryFilter::new().between(day(2019, 1, 1), day(2021, 12, 31)),
    ] {
        let expected = table
            .view(&filter)
            .dated()
            .filter(|(_, r)| r.price_per_ping().is_some())
            .count();

        let monthly = table.monthly_stats(&filter).unwrap();
        let yearly = table.yearly_stats(&filter).unwrap();
        assert_eq!(monthly.iter().map(|m| m.n).sum::<usize>(), expected);
        assert_eq!(yearly.iter().map(|y| y.n).sum::<usize>(), expected);

        assert!(monthly.windows(2).all(|w| w[0].month < w[1].month));
        assert!(yearly.windows(2).all(|w| w[0].year < w[1].year));
    }
}

#[test]
fn monthly_means_use_adjusted_prices() {
    let table = table(&[
        tuple("2022-07-01", "板橋區", "住家用", Some(100.0), Some(0.5)),
        tuple("2022-07-31", "板橋區", "住家用", Some(300.0), Some(0.5)),
        tuple("2022-08-15", "板橋區", "住家用", None, Some(0.5)),
    ]);
    let stats = table
        .monthly_stats(&QueryFilter::new().city(NEW_TAIPEI).district("板橋區"))
        .unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].month, day(2022, 7, 1));
    assert_eq!(stats[0].avg_raw, Some(200.0));
    assert_eq!(stats[0].avg_adj, Some(100.0));
    assert_eq!(stats[0].n, 2);
    assert_eq!(stats[1].n, 0);
    assert_eq!(stats[1].avg_raw, None);

    assert_eq!(
        table.yearly_stats(&QueryFilter::new().district("三重區")),
        Err(QueryError::NoData)
    );
}

#[test]
fn regions_and_health() {
    let table = three_prices();
    let regions = table.list_regions(&QueryFilter::new().usage("住家用"));
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].district, "板橋區");
    assert_eq!(regions[0].n, 3);
    assert_eq!(regions[0].min_date, Some(day(2023, 1, 10)));
    assert_eq!(regions[0].max_date, Some(day(2023, 3, 10)));
    assert_eq!(regions[1].district, "三重區");

    let health = table.health(NEW_TAIPEI);
    assert_eq!(health.rows, 4);
    assert_eq!(health.district_list, vec!["三重區", "板橋區"]);
    assert_eq!(health.missing_districts.len(), 27);

    let audit = table.district_audit(10);
    assert_eq!(audit.unique_pairs, 4);
}
