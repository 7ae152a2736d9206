use anyhow::Result;
use retail_ledger_builder::*;
use std::collections::BTreeMap;

/// Parses a headerless CSV grid into cells. Numeric text becomes a number
/// unless it carries leading zeros, since store codes must stay codes.
fn rows_from_csv(text: &str) -> Result<Rows> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(to_cell).collect());
    }
    Ok(rows)
}

fn to_cell(field: &str) -> Cell {
    let field = field.trim();
    if field.is_empty() {
        return Cell::Empty;
    }
    let leading_zero = field.len() > 1 && field.starts_with('0') && !field.starts_with("0.");
    match field.parse::<f64>() {
        Ok(value) if !leading_zero => Cell::Number(value),
        _ => Cell::from(field),
    }
}

const SELLING_DAYS: u32 = 14;

fn sales_csv() -> String {
    let mut csv = String::from(",,,0001:本店,,0002:駅前店,\n,,,販売金額,,販売金額,\n日付\n");
    for day in 1..=SELLING_DAYS {
        csv.push_str(&format!("2026-02-{:02},,,100000,0,60000,0\n", day));
    }
    csv
}

fn purchase_csv() -> String {
    let mut csv = String::from(
        ",,,0000001:青果市場,,0000002:日配,\n\
         ,,,0001:本店,,0002:駅前店,\n\
         ,,,原価金額,売価金額,原価金額,売価金額\n\
         日付\n",
    );
    for day in 1..=SELLING_DAYS {
        csv.push_str(&format!("2026-02-{:02},,,70000,100000,45000,60000\n", day));
    }
    csv.push_str("合計,,,980000,1400000,630000,840000\n");
    csv
}

fn settings_csv() -> &'static str {
    "店舗コード,期首在庫,期末在庫,粗利予算\n\
     0001,500000,400000,350000\n\
     0002,300000,0,\n"
}

fn budget_csv() -> String {
    let mut csv = String::from("店舗,日付,売上予算\n");
    for day in 1..=28 {
        csv.push_str(&format!("0001,2026-02-{:02},100000\n", day));
    }
    csv
}

fn fixture_reader() -> Result<StaticReader> {
    Ok(StaticReader::new()
        .with_file("売上.csv", rows_from_csv(&sales_csv())?)
        .with_file("仕入.csv", rows_from_csv(&purchase_csv())?)
        .with_file("初期設定.csv", rows_from_csv(settings_csv())?)
        .with_file("予算.csv", rows_from_csv(&budget_csv())?)
        .with_file("memo.csv", rows_from_csv("foo,bar\n1,2\n")?))
}

fn fixture_files() -> Vec<ImportFile> {
    ["売上.csv", "仕入.csv", "初期設定.csv", "予算.csv", "memo.csv"]
        .into_iter()
        .map(|name| ImportFile::new(name, Vec::new()))
        .collect()
}

async fn import_fixture(settings: &AppSettings) -> Result<(ImportSummary, ImportedData)> {
    let reader = fixture_reader()?;
    let files = fixture_files();
    let empty = ImportedData::new();
    Ok(process_dropped_files(&files, &reader, settings, &empty, None, None).await)
}

#[tokio::test]
async fn test_batch_import_with_one_bad_file() -> Result<()> {
    let settings = AppSettings::for_month(2026, 2);
    let reader = fixture_reader()?;
    let files = fixture_files();

    let mut seen = Vec::new();
    let mut progress = |current: usize, total: usize, name: &str| {
        seen.push((current, total, name.to_string()));
    };
    let (summary, data) = process_dropped_files(
        &files,
        &reader,
        &settings,
        &ImportedData::new(),
        None,
        Some(&mut progress),
    )
    .await;

    assert_eq!(summary.success_count, 4);
    assert_eq!(summary.failure_count, 1);
    let failed = &summary.results[4];
    assert!(!failed.ok);
    assert_eq!(failed.filename, "memo.csv");
    assert!(failed.error.is_some());
    assert_eq!(summary.results[0].data_type, Some(DataType::Sales));
    assert_eq!(summary.results[1].data_type, Some(DataType::Purchase));

    assert_eq!(seen.len(), 5);
    assert_eq!(seen[0], (1, 5, "売上.csv".to_string()));

    assert_eq!(data.stores.len(), 2);
    assert_eq!(data.stores["1"].name, "本店");
    assert_eq!(data.suppliers.len(), 2);
    assert_eq!(data.sales.get("2", 3).map(|e| e.sales), Some(60_000.0));
    assert!(data.purchase.get("1", 15).is_none());
    assert_eq!(data.settings["2"].closing_inventory, None);
    assert_eq!(data.budget["1"].total, 2_800_000.0);

    let messages = validate_imported_data(&data);
    assert!(!has_validation_errors(&messages));
    Ok(())
}

#[tokio::test]
async fn test_reimporting_sales_is_idempotent() -> Result<()> {
    let settings = AppSettings::for_month(2026, 2);
    let (_, data) = import_fixture(&settings).await?;

    let reader = fixture_reader()?;
    let again = [ImportFile::new("売上.csv", Vec::new())];
    let (summary, reimported) =
        process_dropped_files(&again, &reader, &settings, &data, None, None).await;

    assert_eq!(summary.success_count, 1);
    assert_eq!(reimported, data);
    Ok(())
}

#[tokio::test]
async fn test_override_type_skips_detection() -> Result<()> {
    let settings = AppSettings::for_month(2026, 2);
    let reader = StaticReader::new().with_file("export.csv", rows_from_csv(&sales_csv())?);
    let files = [ImportFile::new("export.csv", Vec::new())];

    let (summary, data) = process_dropped_files(
        &files,
        &reader,
        &settings,
        &ImportedData::new(),
        Some(DataType::Sales),
        None,
    )
    .await;

    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.results[0].type_name.as_deref(), Some("売上"));
    assert_eq!(data.sales.get("1", 1).map(|e| e.sales), Some(100_000.0));
    Ok(())
}

#[tokio::test]
async fn test_monthly_report_from_imported_files() -> Result<()> {
    let settings = AppSettings::for_month(2026, 2);
    let (_, data) = import_fixture(&settings).await?;
    let report = process_ledger(&data, &settings)?;

    let main = &report.stores["1"];
    assert_eq!(main.total_sales, 1_400_000.0);
    assert_eq!(main.elapsed_days, SELLING_DAYS);
    assert_eq!(main.sales_days, SELLING_DAYS);
    // 500k + 980k - 400k
    assert_eq!(main.inv_method_cogs, Some(1_080_000.0));
    assert_eq!(main.inv_method_gross_profit, Some(320_000.0));
    assert!((main.budget_progress_rate - 1.0).abs() < 1e-9);
    assert!((main.budget_achievement_rate - 0.5).abs() < 1e-9);
    assert!((main.projected_sales - 2_800_000.0).abs() < 1e-6);
    assert_eq!(main.gross_profit_budget, 350_000.0);

    let station = &report.stores["2"];
    assert_eq!(station.inv_method_cogs, None);
    assert_eq!(station.budget, settings.default_budget);
    assert_eq!(station.supplier_totals.len(), 1);

    let aggregate = report.aggregate.as_ref().expect("aggregate");
    assert_eq!(aggregate.total_sales, 2_240_000.0);
    assert_eq!(aggregate.daily.len(), SELLING_DAYS as usize);
    assert_eq!(aggregate.daily[&1].sales, 160_000.0);
    assert_eq!(report.summary.total_sales, 2_240_000.0);

    Ok(())
}

#[tokio::test]
async fn test_alerts_follow_gross_profit_target() -> Result<()> {
    // 320k / 1.4M is about 22.9%: 2.1pt under the default 25% target
    let settings = AppSettings::for_month(2026, 2);
    let (_, data) = import_fixture(&settings).await?;
    let report = process_ledger(&data, &settings)?;

    let gp_alert = report
        .alerts
        .iter()
        .find(|a| a.rule_id == "gp-rate-target" && a.store_id == "1")
        .expect("gross profit alert for store 1");
    assert_eq!(gp_alert.severity, AlertSeverity::Critical);
    assert_eq!(gp_alert.store_name, "本店");
    assert_eq!(report.alerts[0].severity, AlertSeverity::Critical);

    let severities: Vec<_> = report.alerts.iter().map(|a| a.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort();
    assert_eq!(severities, sorted);

    let mut relaxed = settings.clone();
    relaxed.target_gross_profit_rate = 0.24;
    let report = process_ledger(&data, &relaxed)?;
    assert!(!report
        .alerts
        .iter()
        .any(|a| a.rule_id == "gp-rate-target" && a.store_id == "1"));
    Ok(())
}

#[tokio::test]
async fn test_forecasts_over_imported_sales() -> Result<()> {
    let settings = AppSettings::for_month(2026, 2);
    let (_, data) = import_fixture(&settings).await?;
    let stores = build_store_results(&data, &settings);
    let daily_sales = stores["1"].sales_by_day();

    let forecast = calculate_forecast(&ForecastInput {
        year: 2026,
        month: 2,
        daily_sales: daily_sales.clone(),
        daily_gross_profit: BTreeMap::new(),
    });
    assert!(forecast.anomalies.iter().all(|a| !a.is_anomaly));
    let weekly_total: f64 = forecast.weekly_summaries.iter().map(|w| w.total_sales).sum();
    assert_eq!(weekly_total, 1_400_000.0);

    let projection = calculate_month_end_projection(2026, 2, &daily_sales);
    assert_eq!(projection.linear_projection, 2_800_000.0);
    assert_eq!(projection.daily_trend, 0.0);
    Ok(())
}

#[tokio::test]
async fn test_trend_over_monthly_reports() -> Result<()> {
    let settings = AppSettings::for_month(2026, 2);
    let (_, data) = import_fixture(&settings).await?;
    let report = process_ledger(&data, &settings)?;

    let history = [
        (2025, 11, 1_800_000.0),
        (2025, 12, 2_000_000.0),
        (2026, 1, 1_900_000.0),
    ];
    let mut points: Vec<MonthlyDataPoint> = history
        .into_iter()
        .map(|(year, month, total_sales)| MonthlyDataPoint {
            year,
            month,
            total_sales,
            total_customers: None,
            gross_profit: None,
            gross_profit_rate: None,
            budget: None,
            budget_achievement: None,
            store_count: 2,
        })
        .collect();
    points.push(MonthlyDataPoint {
        year: report.year,
        month: report.month,
        total_sales: report.summary.total_sales,
        total_customers: None,
        gross_profit: report.summary.inv_method_gross_profit,
        gross_profit_rate: report.summary.inv_method_gross_profit_rate,
        budget: Some(report.summary.budget),
        budget_achievement: None,
        store_count: report.stores.len() as u32,
    });

    let trend = analyze_trend(&points);
    assert_eq!(trend.data_points.last().map(|p| p.month), Some(2));
    assert_eq!(trend.overall_trend, TrendDirection::Up);
    assert!(trend.moving_avg_3[3].is_some());
    Ok(())
}

#[test]
fn test_settings_round_trip_through_json() -> Result<()> {
    let settings = AppSettings::from_json_str(r#"{"targetYear": 2026, "targetMonth": 2}"#)?;
    assert_eq!(settings.target_gross_profit_rate, 0.25);
    settings.validate()?;

    let report = serde_json::to_string(&process_ledger(&ImportedData::new(), &settings)?)?;
    assert!(report.contains("\"stores\":{}"));
    Ok(())
}
