//! Bias correction of CMIP6 output toward ERA5 weight curves.

use grid_processor::GridSelectionMode;
use meteo_common::{SiUnit, TimerangeDtAndSettings};
use point_reader::datasets::{
    CdsDomain, Cmip6BiasCorrected, Cmip6Derived, Cmip6Domain, Cmip6PreBiasReader, Cmip6Reader,
    Cmip6Variable,
};
use point_reader::{GenericDomain, GenericReaderProtocol, ReaderError, VariableOrDerived};
use test_utils::{
    assert_approx_eq, assert_series_approx_eq, constant, daily, locations, ramp, request,
    seasonal_curve, utc, StoreFixture,
};

const MODEL: Cmip6Domain = Cmip6Domain::MRI_AGCM3_2_S;
const DAYS: usize = 10;

struct Cells {
    model: usize,
    era5: usize,
    era5_land: usize,
}

fn cells() -> Cells {
    let (lat, lon) = locations::ZURICH;
    Cells {
        model: MODEL.grid().find_point(lat, lon).unwrap(),
        era5: CdsDomain::Era5Daily.grid().find_point(lat, lon).unwrap(),
        era5_land: CdsDomain::Era5LandDaily.grid().find_point(lat, lon).unwrap(),
    }
}

fn time() -> TimerangeDtAndSettings {
    request(daily(utc(2024, 1, 1, 0), DAYS))
}

/// Model cell with one daily series and its control curve.
async fn model_fixture(variable: Cmip6Variable, unit: SiUnit, values: Vec<f32>, control: Vec<f32>) -> StoreFixture {
    let cells = cells();
    let fixture = StoreFixture::new();
    fixture.elevation(MODEL.name(), cells.model, 420.0).await;
    fixture
        .series(MODEL.name(), variable_name(variable), cells.model, &time().time, unit, values)
        .await;
    fixture
        .weights(MODEL.name(), variable_name(variable), cells.model, control)
        .await;
    fixture
}

fn variable_name(variable: Cmip6Variable) -> &'static str {
    point_reader::GenericVariable::name(&variable)
}

async fn model(fixture: &StoreFixture, elevation: f32) -> Cmip6PreBiasReader {
    let (lat, lon) = locations::ZURICH;
    Cmip6PreBiasReader::new(MODEL, lat, lon, elevation, GridSelectionMode::Nearest, fixture.shared())
        .await
        .unwrap()
        .expect("model covers the location")
}

async fn era5_only(fixture: &StoreFixture, elevation: f32) -> Cmip6BiasCorrected {
    let (lat, lon) = locations::ZURICH;
    let reader = model(fixture, elevation).await;
    Cmip6BiasCorrected::with_reference(
        reader,
        CdsDomain::Era5Daily,
        lat,
        lon,
        elevation,
        GridSelectionMode::Nearest,
        fixture.shared(),
    )
    .await
    .unwrap()
    .expect("ERA5 covers the location")
}

fn raw(variable: Cmip6Variable) -> VariableOrDerived<Cmip6Variable, Cmip6Derived> {
    VariableOrDerived::Raw(variable)
}

#[tokio::test]
async fn test_identical_curves_leave_series_unchanged() {
    let cells = cells();
    let curve = seasonal_curve(4.0, 6.0, 12);
    let values = ramp(-3.0, 0.7, DAYS);
    let fixture = model_fixture(Cmip6Variable::Temperature2mMean, SiUnit::Celsius, values.clone(), curve.clone()).await;
    fixture.elevation("era5_daily", cells.era5, 420.0).await;
    fixture
        .weights("era5_daily", "temperature_2m_mean", cells.era5, curve)
        .await;

    let corrector = era5_only(&fixture, f32::NAN).await;
    let data = corrector
        .get(raw(Cmip6Variable::Temperature2mMean), &time())
        .await
        .unwrap();
    assert_eq!(data.unit, SiUnit::Celsius);
    assert_series_approx_eq!(&data.data, &values, 1e-4);
}

#[tokio::test]
async fn test_lapse_rate_from_reference_to_target_elevation() {
    let cells = cells();
    let curve = constant(5.0, 12);
    let fixture =
        model_fixture(Cmip6Variable::Temperature2mMean, SiUnit::Celsius, constant(15.0, DAYS), curve.clone()).await;
    fixture.elevation("era5_daily", cells.era5, 0.0).await;
    fixture
        .weights("era5_daily", "temperature_2m_mean", cells.era5, curve)
        .await;

    let corrector = era5_only(&fixture, 1000.0).await;
    assert_eq!(corrector.target_elevation(), 1000.0);
    let data = corrector
        .get(raw(Cmip6Variable::Temperature2mMean), &time())
        .await
        .unwrap();
    for value in data.data {
        assert_approx_eq!(value, 8.5, 1e-4);
    }
}

#[tokio::test]
async fn test_absolute_and_relative_change() {
    let cells = cells();
    let fixture = model_fixture(
        Cmip6Variable::Temperature2mMean,
        SiUnit::Celsius,
        constant(15.0, DAYS),
        constant(10.0, 12),
    )
    .await;
    let precipitation = [0.0, 1.0, 4.0, 0.0, 2.0, 0.0, 0.0, 8.0, 0.0, 1.0];
    fixture
        .series(MODEL.name(), "precipitation_sum", cells.model, &time().time, SiUnit::Millimetre, precipitation.to_vec())
        .await;
    fixture
        .weights(MODEL.name(), "precipitation_sum", cells.model, constant(2.0, 12))
        .await;
    fixture.elevation("era5_daily", cells.era5, 420.0).await;
    fixture
        .weights("era5_daily", "temperature_2m_mean", cells.era5, constant(12.0, 12))
        .await;
    fixture
        .weights("era5_daily", "precipitation_sum", cells.era5, constant(3.0, 12))
        .await;

    let corrector = era5_only(&fixture, f32::NAN).await;
    let temperature = corrector
        .get(raw(Cmip6Variable::Temperature2mMean), &time())
        .await
        .unwrap();
    assert_series_approx_eq!(&temperature.data, &constant(17.0, DAYS), 1e-5);

    let precipitation_corrected = corrector
        .get(raw(Cmip6Variable::PrecipitationSum), &time())
        .await
        .unwrap();
    let expected: Vec<f32> = precipitation.iter().map(|p| p * 1.5).collect();
    assert_series_approx_eq!(&precipitation_corrected.data, &expected, 1e-5);
}

#[tokio::test]
async fn test_relative_change_with_dry_control_is_unchanged() {
    let cells = cells();
    let values = vec![0.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let fixture = model_fixture(
        Cmip6Variable::SnowfallWaterEquivalentSum,
        SiUnit::Millimetre,
        values.clone(),
        constant(0.0, 12),
    )
    .await;
    fixture.elevation("era5_daily", cells.era5, 420.0).await;
    fixture
        .weights("era5_daily", "snowfall_water_equivalent_sum", cells.era5, constant(1.0, 12))
        .await;

    let corrector = era5_only(&fixture, f32::NAN).await;
    let data = corrector
        .get(raw(Cmip6Variable::SnowfallWaterEquivalentSum), &time())
        .await
        .unwrap();
    assert_eq!(data.data, values);
}

#[tokio::test]
async fn test_corrected_values_clamped_into_bounds() {
    let cells = cells();
    let fixture = model_fixture(
        Cmip6Variable::CloudCoverMean,
        SiUnit::Percentage,
        ramp(10.0, 10.0, DAYS),
        constant(50.0, 12),
    )
    .await;
    fixture.elevation("era5_daily", cells.era5, 420.0).await;
    fixture
        .weights("era5_daily", "cloud_cover_mean", cells.era5, constant(80.0, 12))
        .await;

    let corrector = era5_only(&fixture, f32::NAN).await;
    let data = corrector
        .get(raw(Cmip6Variable::CloudCoverMean), &time())
        .await
        .unwrap();
    assert_eq!(data.data[0], 40.0);
    assert_eq!(data.data[6], 100.0);
    assert!(data.data.iter().all(|v| (0.0..=100.0).contains(v)));
}

#[tokio::test]
async fn test_missing_reference_weights_is_an_error() {
    let cells = cells();
    let fixture = model_fixture(
        Cmip6Variable::Temperature2mMean,
        SiUnit::Celsius,
        constant(15.0, DAYS),
        constant(10.0, 12),
    )
    .await;
    fixture.elevation("era5_daily", cells.era5, 420.0).await;

    let corrector = era5_only(&fixture, f32::NAN).await;
    let err = corrector
        .get(raw(Cmip6Variable::Temperature2mMean), &time())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ReaderError::MissingReferenceWeights {
            variable: "temperature_2m_mean".to_string(),
            domain: "era5_daily".to_string(),
        }
    );
}

#[tokio::test]
async fn test_reference_curve_with_nan_is_unusable() {
    let cells = cells();
    let fixture = model_fixture(
        Cmip6Variable::Temperature2mMean,
        SiUnit::Celsius,
        constant(15.0, DAYS),
        constant(10.0, 12),
    )
    .await;
    let mut curve = constant(12.0, 12);
    curve[4] = f32::NAN;
    fixture.elevation("era5_daily", cells.era5, 420.0).await;
    fixture
        .weights("era5_daily", "temperature_2m_mean", cells.era5, curve)
        .await;

    let corrector = era5_only(&fixture, f32::NAN).await;
    let err = corrector
        .get(raw(Cmip6Variable::Temperature2mMean), &time())
        .await
        .unwrap_err();
    assert!(matches!(err, ReaderError::MissingReferenceWeights { .. }));
}

#[tokio::test]
async fn test_missing_control_weights_names_model() {
    let cells = cells();
    let fixture = StoreFixture::new();
    fixture.elevation(MODEL.name(), cells.model, 420.0).await;
    fixture
        .series(MODEL.name(), "temperature_2m_mean", cells.model, &time().time, SiUnit::Celsius, constant(1.0, DAYS))
        .await;
    fixture
        .weights("era5_daily", "temperature_2m_mean", cells.era5, constant(1.0, 12))
        .await;

    let corrector = era5_only(&fixture, f32::NAN).await;
    let err = corrector
        .get(raw(Cmip6Variable::Temperature2mMean), &time())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ReaderError::missing_weights("temperature_2m_mean", "MRI_AGCM3_2_S")
    );
}

#[tokio::test]
async fn test_seamless_falls_back_to_era5() {
    let cells = cells();
    let (lat, lon) = locations::ZURICH;
    let fixture = model_fixture(
        Cmip6Variable::Temperature2mMean,
        SiUnit::Celsius,
        constant(15.0, DAYS),
        constant(10.0, 12),
    )
    .await;
    // ERA5-Land is land here but has no curve for the variable
    fixture.elevation("era5_land_daily", cells.era5_land, 500.0).await;
    fixture.elevation("era5_daily", cells.era5, 200.0).await;
    fixture
        .weights("era5_daily", "temperature_2m_mean", cells.era5, constant(12.0, 12))
        .await;

    let reader = model(&fixture, 200.0).await;
    let corrector = Cmip6BiasCorrected::era5_seamless(
        reader,
        lat,
        lon,
        200.0,
        GridSelectionMode::Nearest,
        fixture.shared(),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(corrector.references().len(), 2);
    assert_eq!(corrector.references()[0].dataset, "era5_land_daily");
    assert_eq!(corrector.model_elevation().numeric(), 500.0);

    // ERA5 weights and ERA5 elevation: no lapse rate shift
    let data = corrector
        .get(raw(Cmip6Variable::Temperature2mMean), &time())
        .await
        .unwrap();
    assert_series_approx_eq!(&data.data, &constant(17.0, DAYS), 1e-5);
}

#[tokio::test]
async fn test_seamless_prefers_era5_land() {
    let cells = cells();
    let (lat, lon) = locations::ZURICH;
    let fixture = model_fixture(
        Cmip6Variable::Temperature2mMean,
        SiUnit::Celsius,
        constant(15.0, DAYS),
        constant(10.0, 12),
    )
    .await;
    fixture.elevation("era5_land_daily", cells.era5_land, 420.0).await;
    fixture
        .weights("era5_land_daily", "temperature_2m_mean", cells.era5_land, constant(11.0, 12))
        .await;
    fixture.elevation("era5_daily", cells.era5, 420.0).await;
    fixture
        .weights("era5_daily", "temperature_2m_mean", cells.era5, constant(12.0, 12))
        .await;

    let reader = model(&fixture, 420.0).await;
    let corrector = Cmip6BiasCorrected::era5_seamless(
        reader,
        lat,
        lon,
        420.0,
        GridSelectionMode::Nearest,
        fixture.shared(),
    )
    .await
    .unwrap()
    .unwrap();
    let data = corrector
        .get(raw(Cmip6Variable::Temperature2mMean), &time())
        .await
        .unwrap();
    assert_series_approx_eq!(&data.data, &constant(16.0, DAYS), 1e-5);
}

#[tokio::test]
async fn test_sea_point_has_no_land_reference() {
    let cells = cells();
    let (lat, lon) = locations::ZURICH;
    let fixture = StoreFixture::new();
    fixture.elevation("era5_land_daily", cells.era5_land, -999.0).await;
    fixture.elevation("era5_daily", cells.era5, 0.0).await;

    let reader = model(&fixture, f32::NAN).await;
    let corrector = Cmip6BiasCorrected::era5_seamless(
        reader,
        lat,
        lon,
        f32::NAN,
        GridSelectionMode::Nearest,
        fixture.shared(),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(corrector.references().len(), 1);
    assert_eq!(corrector.references()[0].dataset, "era5_daily");
}

#[tokio::test]
async fn test_corrected_reader_end_to_end() {
    let cells = cells();
    let (lat, lon) = locations::ZURICH;
    let fixture = model_fixture(
        Cmip6Variable::Temperature2mMean,
        SiUnit::Celsius,
        constant(15.0, DAYS),
        constant(10.0, 12),
    )
    .await;
    fixture.elevation("era5_daily", cells.era5, 420.0).await;
    fixture
        .weights("era5_daily", "temperature_2m_mean", cells.era5, constant(9.0, 12))
        .await;

    let reader = Cmip6Reader::new(MODEL, lat, lon, f32::NAN, GridSelectionMode::Nearest, fixture.shared())
        .await
        .unwrap()
        .unwrap();
    let data = reader
        .get(
            VariableOrDerived::Raw(raw(Cmip6Variable::Temperature2mMean)),
            &time(),
        )
        .await
        .unwrap();
    assert_series_approx_eq!(&data.data, &constant(14.0, DAYS), 1e-5);
}
