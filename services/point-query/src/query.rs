//! Resolve a dataset name to a reader and read the requested variables.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use meteo_common::{DataAndUnit, ElevationOrSea, TimerangeDt, TimerangeDtAndSettings};
use point_reader::datasets::{
    BomDomain, BomReader, CamsDomain, CamsMixer, CdsDomain, CerraReader, Cmip6Domain,
    Cmip6Reader, Cmip6ReaderUncorrected,
};
use point_reader::{GenericDomain, GenericReaderProtocol, ReaderConfig, ReaderError};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use storage::TimeSeriesStore;
use tracing::{debug, info};

/// A dataset the command line can query.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Cerra,
    Bom(BomDomain),
    Cmip6(Cmip6Domain),
    /// CAMS domains in mixing order.
    Cams(Vec<CamsDomain>),
}

impl FromStr for Dataset {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "cams" {
            return Ok(Self::Cams(CamsDomain::MIXING_ORDER.to_vec()));
        }
        if let Ok(domain) = s.parse::<CamsDomain>() {
            return Ok(Self::Cams(vec![domain]));
        }
        if s.parse::<CdsDomain>() == Ok(CdsDomain::Cerra) {
            return Ok(Self::Cerra);
        }
        if let Ok(domain) = s.parse::<BomDomain>() {
            return Ok(Self::Bom(domain));
        }
        s.parse::<Cmip6Domain>()
            .map(Self::Cmip6)
            .map_err(|_| ReaderError::UnknownVariable(format!("domain {}", s)))
    }
}

/// What to read and where.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub latitude: f32,
    pub longitude: f32,
    pub elevation: Option<f32>,
    pub start: DateTime<Utc>,
    pub count: usize,
    /// Time step in seconds. The dataset's native step if not set.
    pub dt_seconds: Option<i64>,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryColumn {
    pub variable: String,
    #[serde(flatten)]
    pub values: DataAndUnit,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub latitude: f32,
    pub longitude: f32,
    pub model_elevation: ElevationOrSea,
    pub time: TimerangeDt,
    pub columns: Vec<QueryColumn>,
}

impl QueryResult {
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.time.iter().collect()
    }
}

/// Build the reader for `dataset` and read every requested variable.
pub async fn run_query(
    dataset: &Dataset,
    request: &QueryRequest,
    config: &ReaderConfig,
    store: Arc<dyn TimeSeriesStore>,
) -> Result<QueryResult> {
    let lat = request.latitude;
    let lon = request.longitude;
    let elevation = request.elevation.unwrap_or(f32::NAN);
    let mode = config.cell_selection;

    info!(
        dataset = ?dataset,
        lat = lat,
        lon = lon,
        variables = request.variables.len(),
        "Running point query"
    );

    match dataset {
        Dataset::Cerra => {
            let reader = CerraReader::new(CdsDomain::Cerra, lat, lon, elevation, mode, store).await?;
            read_columns(covered(reader)?, request, config).await
        }
        Dataset::Bom(domain) => {
            let reader = BomReader::new(*domain, lat, lon, elevation, mode, store).await?;
            read_columns(covered(reader)?, request, config).await
        }
        Dataset::Cmip6(domain) if config.bias_correction => {
            let reader = Cmip6Reader::with_weights(
                *domain,
                lat,
                lon,
                elevation,
                mode,
                config.reference_weights,
                store,
            )
            .await?;
            read_columns(covered(reader)?, request, config).await
        }
        Dataset::Cmip6(domain) => {
            let reader = Cmip6ReaderUncorrected::new(*domain, lat, lon, elevation, mode, store).await?;
            read_columns(covered(reader)?, request, config).await
        }
        Dataset::Cams(domains) => {
            let reader =
                CamsMixer::from_domains(domains, lat, lon, elevation, mode, store, config.coverage)
                    .await?;
            read_columns(covered(reader)?, request, config).await
        }
    }
}

fn covered<R>(reader: Option<R>) -> Result<R> {
    reader.ok_or_else(|| ReaderError::NoDataForLocation.into())
}

async fn read_columns<R>(reader: R, request: &QueryRequest, config: &ReaderConfig) -> Result<QueryResult>
where
    R: GenericReaderProtocol,
    R::MixingVar: FromStr,
{
    let variables = request
        .variables
        .iter()
        .map(|name| {
            name.parse::<R::MixingVar>()
                .map_err(|_| ReaderError::UnknownVariable(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let dt_seconds = request.dt_seconds.unwrap_or_else(|| reader.model_dt_seconds());
    let time = TimerangeDt::with_count(request.start, request.count, dt_seconds)
        .context("Invalid time range")?;
    let settings = TimerangeDtAndSettings::new(time.clone()).with_panel(config.tilt, config.azimuth);

    reader.prefetch_many(&variables, &settings).await?;

    let mut columns = Vec::with_capacity(variables.len());
    for (variable, name) in variables.iter().zip(&request.variables) {
        let values = reader
            .get(*variable, &settings)
            .await
            .with_context(|| format!("Failed to read {}", name))?;
        debug!(variable = %name, missing = values.count_missing(), "Read variable");
        columns.push(QueryColumn {
            variable: name.clone(),
            values,
        });
    }

    Ok(QueryResult {
        latitude: reader.model_lat(),
        longitude: reader.model_lon(),
        model_elevation: reader.model_elevation(),
        time,
        columns,
    })
}

/// Domain names accepted on the command line.
pub fn dataset_names() -> Vec<&'static str> {
    let mut names = vec!["cams", CdsDomain::Cerra.name(), BomDomain::AccessGlobal.name()];
    names.extend(CamsDomain::MIXING_ORDER.iter().map(|d| d.name()));
    names.extend(Cmip6Domain::ALL.iter().map(|d| d.name()));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_processor::GridSelectionMode;
    use meteo_common::SiUnit;
    use point_reader::CoveragePolicy;
    use test_utils::{assert_approx_eq, constant, locations, utc, StoreFixture};

    fn nearest() -> ReaderConfig {
        ReaderConfig {
            cell_selection: GridSelectionMode::Nearest,
            ..Default::default()
        }
    }

    fn request(variables: &[&str], count: usize) -> QueryRequest {
        let (latitude, longitude) = locations::ZURICH;
        QueryRequest {
            latitude,
            longitude,
            elevation: None,
            start: utc(2024, 6, 1, 0),
            count,
            dt_seconds: None,
            variables: variables.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_dataset_names_parse() {
        assert_eq!("cerra".parse::<Dataset>().unwrap(), Dataset::Cerra);
        assert_eq!(
            "cams".parse::<Dataset>().unwrap(),
            Dataset::Cams(vec![CamsDomain::Global, CamsDomain::Europe])
        );
        assert_eq!(
            "cams_europe".parse::<Dataset>().unwrap(),
            Dataset::Cams(vec![CamsDomain::Europe])
        );
        assert_eq!(
            "FGOALS_f3_H".parse::<Dataset>().unwrap(),
            Dataset::Cmip6(Cmip6Domain::FGOALS_f3_H)
        );
        assert!("era5".parse::<Dataset>().is_err());
        for name in dataset_names() {
            assert!(name.parse::<Dataset>().is_ok(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_cerra_query_uses_native_step() {
        let (lat, lon) = locations::ZURICH;
        let cell = CdsDomain::Cerra.grid().find_point(lat, lon).unwrap();
        let time = TimerangeDt::with_count(utc(2024, 6, 1, 0), 4, 3 * 3600).unwrap();
        let fixture = StoreFixture::new();
        fixture.elevation("cerra", cell, 410.0).await;
        fixture
            .series("cerra", "temperature_2m", cell, &time, SiUnit::Celsius, constant(20.0, 4))
            .await;
        fixture
            .series("cerra", "relative_humidity_2m", cell, &time, SiUnit::Percentage, constant(50.0, 4))
            .await;

        let result = run_query(
            &Dataset::Cerra,
            &request(&["temperature_2m", "dew_point_2m"], 4),
            &nearest(),
            fixture.shared(),
        )
        .await
        .unwrap();

        assert_eq!(result.time.dt_seconds, 3 * 3600);
        assert_eq!(result.timestamps().len(), 4);
        assert_eq!(result.model_elevation, ElevationOrSea::Elevation(410.0));
        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.columns[0].values.data, vec![20.0; 4]);
        assert_approx_eq!(result.columns[1].values.data[0], 9.3, 0.2);
    }

    #[tokio::test]
    async fn test_unknown_variable_is_rejected() {
        let fixture = StoreFixture::new();
        let err = run_query(&Dataset::Cerra, &request(&["pm10"], 2), &nearest(), fixture.shared())
            .await
            .unwrap_err();
        let err = err.downcast::<ReaderError>().unwrap();
        assert_eq!(err, ReaderError::UnknownVariable("pm10".to_string()));
    }

    #[tokio::test]
    async fn test_uncovered_location() {
        let fixture = StoreFixture::new();
        let mut request = request(&["pm10"], 2);
        (request.latitude, request.longitude) = locations::SYDNEY;
        let dataset = Dataset::Cams(vec![CamsDomain::Europe]);
        let err = run_query(&dataset, &request, &nearest(), fixture.shared())
            .await
            .unwrap_err();
        assert_eq!(err.downcast::<ReaderError>().unwrap(), ReaderError::NoDataForLocation);
    }

    #[tokio::test]
    async fn test_strict_coverage_fails_on_gaps() {
        let (lat, lon) = locations::VIENNA;
        let fixture = StoreFixture::new();
        let time = TimerangeDt::with_count(utc(2024, 6, 1, 0), 3, 3600).unwrap();
        for domain in CamsDomain::MIXING_ORDER {
            let cell = domain.grid().find_point(lat, lon).unwrap();
            fixture
                .series(
                    domain.name(),
                    "pm10",
                    cell,
                    &time,
                    SiUnit::MicrogramsPerCubicMetre,
                    vec![f32::NAN, 12.0, f32::NAN],
                )
                .await;
        }
        let mut request = request(&["pm10"], 3);
        (request.latitude, request.longitude) = (lat, lon);

        let lenient = run_query(&Dataset::Cams(CamsDomain::MIXING_ORDER.to_vec()), &request, &nearest(), fixture.shared())
            .await
            .unwrap();
        assert_eq!(lenient.columns[0].values.count_missing(), 2);

        let strict = ReaderConfig {
            coverage: CoveragePolicy::RequireComplete,
            ..nearest()
        };
        let err = run_query(&Dataset::Cams(CamsDomain::MIXING_ORDER.to_vec()), &request, &strict, fixture.shared())
            .await
            .unwrap_err();
        assert!(matches!(
            err.root_cause().downcast_ref::<ReaderError>(),
            Some(ReaderError::IncompleteCoverage { missing: 2, .. })
        ));
    }
}
