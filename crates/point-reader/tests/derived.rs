//! Derived variables computed end to end from stored raw series.

use meteo_common::{SiUnit, TimerangeDt, TimerangeDtAndSettings};
use point_reader::datasets::{
    BomDomain, BomReader, BomVariableDerived, BomVariableOrDerived, CdsDomain, CerraReader,
    CerraVariableDerived, CerraVariableOrDerived, Cmip6Domain, Cmip6PreBiasReader,
    Cmip6ReaderUncorrected, Cmip6VariablePostBias,
};
use point_reader::{GenericDomain, GenericReaderProtocol, ReaderError, VariableOrDerived};
use test_utils::{
    assert_approx_eq, assert_series_approx_eq, constant, daily, hourly, locations, request, utc,
    StoreFixture,
};

fn three_hourly(count: usize) -> TimerangeDt {
    TimerangeDt::with_count(utc(2024, 6, 1, 0), count, 3 * 3600).unwrap()
}

fn cerra_cell() -> usize {
    let (lat, lon) = locations::ZURICH;
    CdsDomain::Cerra.grid().find_point(lat, lon).unwrap()
}

async fn cerra(fixture: &StoreFixture) -> CerraReader {
    CerraReader::at_gridpoint(CdsDomain::Cerra, cerra_cell(), fixture.shared())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_cerra_dewpoint_from_temperature_and_humidity() {
    let time = three_hourly(4);
    let fixture = StoreFixture::new();
    fixture
        .series("cerra", "temperature_2m", cerra_cell(), &time, SiUnit::Celsius, constant(20.0, 4))
        .await;
    fixture
        .series("cerra", "relative_humidity_2m", cerra_cell(), &time, SiUnit::Percentage, constant(50.0, 4))
        .await;
    let reader = cerra(&fixture).await;

    let dewpoint = reader
        .get(VariableOrDerived::Derived(CerraVariableDerived::Dewpoint2m), &request(time.clone()))
        .await
        .unwrap();
    assert_eq!(dewpoint.unit, SiUnit::Celsius);
    for value in &dewpoint.data {
        assert_approx_eq!(*value, 9.3, 0.2);
    }

    // The alias reads the same rule
    let variable: CerraVariableOrDerived = "dew_point_2m".parse().unwrap();
    let alias = reader.get(variable, &request(time)).await.unwrap();
    assert_eq!(alias.data, dewpoint.data);
}

#[tokio::test]
async fn test_cerra_rain_is_floored() {
    let time = three_hourly(2);
    let fixture = StoreFixture::new();
    fixture
        .series("cerra", "precipitation", cerra_cell(), &time, SiUnit::Millimetre, vec![10.0, 3.0])
        .await;
    fixture
        .series("cerra", "snowfall_water_equivalent", cerra_cell(), &time, SiUnit::Millimetre, vec![4.0, 5.0])
        .await;
    let reader = cerra(&fixture).await;

    let rain = reader
        .get(VariableOrDerived::Derived(CerraVariableDerived::Rain), &request(time.clone()))
        .await
        .unwrap();
    assert_eq!(rain.data, vec![6.0, 0.0]);

    let snowfall = reader
        .get(VariableOrDerived::Derived(CerraVariableDerived::Snowfall), &request(time))
        .await
        .unwrap();
    assert_eq!(snowfall.unit, SiUnit::Centimetre);
    assert_series_approx_eq!(&snowfall.data, &[2.8, 3.5], 1e-5);
}

#[tokio::test]
async fn test_cerra_vpd_builds_on_dewpoint() {
    let time = three_hourly(3);
    let fixture = StoreFixture::new();
    fixture
        .series("cerra", "temperature_2m", cerra_cell(), &time, SiUnit::Celsius, vec![20.0, 25.0, 10.0])
        .await;
    fixture
        .series("cerra", "relative_humidity_2m", cerra_cell(), &time, SiUnit::Percentage, vec![100.0, 40.0, 80.0])
        .await;
    let reader = cerra(&fixture).await;

    let vpd = reader
        .get(VariableOrDerived::Derived(CerraVariableDerived::VapourPressureDeficit), &request(time))
        .await
        .unwrap();
    assert_approx_eq!(vpd.data[0], 0.0, 1e-3);
    assert!(vpd.data[1] > vpd.data[2]);
    assert!(vpd.data.iter().all(|v| *v >= 0.0));
}

#[tokio::test]
async fn test_location_only_rules_need_no_data() {
    let time = three_hourly(8);
    let fixture = StoreFixture::new();
    let reader = cerra(&fixture).await;

    let is_day = reader
        .get(VariableOrDerived::Derived(CerraVariableDerived::IsDay), &request(time))
        .await
        .unwrap();
    assert_eq!(is_day.data[0], 0.0);
    assert_eq!(is_day.data[4], 1.0);
    assert_eq!(is_day.data[7], 0.0);
    assert_eq!(fixture.store().stats().reads, 0);
}

#[tokio::test]
async fn test_missing_dependency_propagates() {
    let time = three_hourly(2);
    let fixture = StoreFixture::new();
    fixture
        .series("cerra", "temperature_2m", cerra_cell(), &time, SiUnit::Celsius, constant(20.0, 2))
        .await;
    let reader = cerra(&fixture).await;

    let err = reader
        .get(VariableOrDerived::Derived(CerraVariableDerived::Dewpoint2m), &request(time))
        .await
        .unwrap_err();
    assert!(matches!(err, ReaderError::NotFound(ref m) if m.contains("relative_humidity_2m")));
}

fn bom_cell() -> usize {
    let (lat, lon) = locations::SYDNEY;
    BomDomain::AccessGlobal.grid().find_point(lat, lon).unwrap()
}

#[tokio::test]
async fn test_bom_rain_excludes_snow_and_showers() {
    let time = hourly(utc(2024, 7, 1, 0), 3);
    let fixture = StoreFixture::new();
    let cell = bom_cell();
    let dataset = "bom_access_global";
    fixture
        .series(dataset, "precipitation", cell, &time, SiUnit::Millimetre, vec![10.0, 3.0, 10.0])
        .await;
    fixture
        .series(dataset, "snowfall_water_equivalent", cell, &time, SiUnit::Millimetre, vec![4.0, 5.0, 4.0])
        .await;
    fixture
        .series(dataset, "showers", cell, &time, SiUnit::Millimetre, vec![0.0, 0.0, 2.5])
        .await;
    let reader = BomReader::at_gridpoint(BomDomain::AccessGlobal, cell, fixture.shared())
        .await
        .unwrap();

    let rain = reader
        .get(VariableOrDerived::Derived(BomVariableDerived::Rain), &request(time))
        .await
        .unwrap();
    assert_eq!(rain.unit, SiUnit::Millimetre);
    assert_eq!(rain.data, vec![6.0, 0.0, 3.5]);
}

#[tokio::test]
async fn test_bom_legacy_names_pass_through() {
    let time = hourly(utc(2024, 7, 1, 0), 2);
    let fixture = StoreFixture::new();
    let cell = bom_cell();
    fixture
        .series("bom_access_global", "relative_humidity_2m", cell, &time, SiUnit::Percentage, vec![55.0, 60.0])
        .await;
    fixture
        .series("bom_access_global", "soil_moisture_10_to_35cm", cell, &time, SiUnit::CubicMetrePerCubicMetre, vec![0.3, 0.31])
        .await;
    let reader = BomReader::at_gridpoint(BomDomain::AccessGlobal, cell, fixture.shared())
        .await
        .unwrap();

    let legacy: BomVariableOrDerived = "relativehumidity_2m".parse().unwrap();
    let data = reader.get(legacy, &request(time.clone())).await.unwrap();
    assert_eq!(data.data, vec![55.0, 60.0]);

    let renamed: BomVariableOrDerived = "soil_moisture_10_to_40cm".parse().unwrap();
    let data = reader.get(renamed, &request(time)).await.unwrap();
    assert_eq!(data.data, vec![0.3, 0.31]);
}

fn cmip6_time(days: usize) -> TimerangeDtAndSettings {
    request(daily(utc(2030, 3, 1, 0), days))
}

async fn cmip6_fixture(domain: Cmip6Domain) -> (StoreFixture, usize) {
    let (lat, lon) = locations::ZURICH;
    let cell = domain.grid().find_point(lat, lon).unwrap();
    let time = cmip6_time(3).time;
    let fixture = StoreFixture::new();
    let name = domain.name();
    fixture
        .series(name, "temperature_2m_max", cell, &time, SiUnit::Celsius, constant(24.0, 3))
        .await;
    fixture
        .series(name, "temperature_2m_min", cell, &time, SiUnit::Celsius, constant(16.0, 3))
        .await;
    fixture
        .series(name, "relative_humidity_2m_mean", cell, &time, SiUnit::Percentage, constant(50.0, 3))
        .await;
    fixture
        .series(name, "precipitation_sum", cell, &time, SiUnit::Millimetre, vec![10.0, 3.0, 0.0])
        .await;
    fixture
        .series(name, "snowfall_water_equivalent_sum", cell, &time, SiUnit::Millimetre, vec![4.0, 5.0, 0.0])
        .await;
    (fixture, cell)
}

async fn uncorrected(domain: Cmip6Domain, fixture: &StoreFixture, cell: usize) -> Cmip6ReaderUncorrected {
    let model = Cmip6PreBiasReader::at_gridpoint(domain, cell, fixture.shared())
        .await
        .unwrap();
    Cmip6ReaderUncorrected::wrap(model, domain)
}

#[tokio::test]
async fn test_cmip6_daily_dewpoint_falls_back_to_mean_humidity() {
    let domain = Cmip6Domain::FGOALS_f3_H;
    assert!(!domain.has_humidity_extremes());
    let (fixture, cell) = cmip6_fixture(domain).await;
    let reader = uncorrected(domain, &fixture, cell).await;

    let mean = reader
        .get(VariableOrDerived::Derived(Cmip6VariablePostBias::Dewpoint2mMean), &cmip6_time(3))
        .await
        .unwrap();
    for value in &mean.data {
        assert_approx_eq!(*value, 9.3, 0.2);
    }
    let max = reader
        .get(VariableOrDerived::Derived(Cmip6VariablePostBias::Dewpoint2mMax), &cmip6_time(3))
        .await
        .unwrap();
    assert_eq!(max.data, mean.data);
}

#[tokio::test]
async fn test_cmip6_models_with_extremes_need_them() {
    let domain = Cmip6Domain::CMCC_CM2_VHR4;
    let (fixture, cell) = cmip6_fixture(domain).await;
    let reader = uncorrected(domain, &fixture, cell).await;

    let err = reader
        .get(VariableOrDerived::Derived(Cmip6VariablePostBias::Dewpoint2mMax), &cmip6_time(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ReaderError::NotFound(ref m) if m.contains("relative_humidity_2m_max")));
}

#[tokio::test]
async fn test_cmip6_precipitation_split() {
    let domain = Cmip6Domain::MRI_AGCM3_2_S;
    let (fixture, cell) = cmip6_fixture(domain).await;
    let reader = uncorrected(domain, &fixture, cell).await;

    let rain = reader
        .get(VariableOrDerived::Derived(Cmip6VariablePostBias::RainSum), &cmip6_time(3))
        .await
        .unwrap();
    assert_eq!(rain.data, vec![6.0, 0.0, 0.0]);

    let snowfall = reader
        .get(VariableOrDerived::Derived(Cmip6VariablePostBias::SnowfallSum), &cmip6_time(3))
        .await
        .unwrap();
    assert_series_approx_eq!(&snowfall.data, &[2.8, 3.5, 0.0], 1e-5);

    let gdd = reader
        .get(
            VariableOrDerived::Derived(Cmip6VariablePostBias::GrowingDegreeDaysBase0Limit50),
            &cmip6_time(3),
        )
        .await
        .unwrap();
    assert_eq!(gdd.data, vec![20.0, 20.0, 20.0]);
}

#[tokio::test]
async fn test_cmip6_soil_moisture_index_needs_soil_type() {
    let domain = Cmip6Domain::FGOALS_f3_H;
    let (fixture, cell) = cmip6_fixture(domain).await;
    fixture
        .series(
            domain.name(),
            "soil_moisture_0_to_10cm_mean",
            cell,
            &cmip6_time(3).time,
            SiUnit::CubicMetrePerCubicMetre,
            constant(0.25, 3),
        )
        .await;
    let reader = uncorrected(domain, &fixture, cell).await;
    let variable = VariableOrDerived::Derived(Cmip6VariablePostBias::SoilMoistureIndex0To10cmMean);

    let err = reader.get(variable, &cmip6_time(3)).await.unwrap_err();
    assert_eq!(
        err,
        ReaderError::MissingStatic {
            field: "soil_type".to_string(),
            domain: "FGOALS_f3_H".to_string(),
        }
    );

    fixture.soil_type(domain.name(), cell, 3.0).await;
    let index = reader.get(variable, &cmip6_time(3)).await.unwrap();
    assert_eq!(index.unit, SiUnit::Fraction);
    assert!(index.data.iter().all(|v| v.is_finite()));
}
