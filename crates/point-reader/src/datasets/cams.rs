//! CAMS air quality forecasts, global and European.
//!
//! Both domains share one variable set. The European domain is finer and
//! takes precedence over the global one in [`CamsMixer`].

use grid_processor::RegularGrid;
use meteo_common::SiUnit;

use crate::domain::GenericDomain;
use crate::mixer::GenericReaderMixer;
use crate::reader::GenericReaderCached;
use crate::variable::{GenericVariableMixable, RawVariable, ReaderInterpolation};
use crate::{domain_names, variable_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CamsDomain {
    Global,
    Europe,
}

domain_names!(CamsDomain {
    Global => "cams_global",
    Europe => "cams_europe",
});

impl CamsDomain {
    /// Coarsest first, the order a mixer expects.
    pub const MIXING_ORDER: [CamsDomain; 2] = [CamsDomain::Global, CamsDomain::Europe];
}

impl GenericDomain for CamsDomain {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn grid(&self) -> RegularGrid {
        match self {
            Self::Global => RegularGrid::new_unchecked(900, 451, -90.0, -180.0, 0.4, 0.4),
            // Rows run north to south
            Self::Europe => RegularGrid::new_unchecked(700, 420, 71.95, -24.95, 0.1, -0.1),
        }
    }

    fn dt_seconds(&self) -> i64 {
        3600
    }

    fn update_interval_seconds(&self) -> i64 {
        match self {
            Self::Global => 12 * 3600,
            Self::Europe => 24 * 3600,
        }
    }
}

variable_enum! {
    /// Air quality variables. Not every domain provides every variable;
    /// missing ones read as NaN and are filled by the next source.
    pub enum CamsVariable {
        Pm10 => "pm10",
        Pm2_5 => "pm2_5",
        Dust => "dust",
        AerosolOpticalDepth => "aerosol_optical_depth",
        CarbonMonoxide => "carbon_monoxide",
        CarbonDioxide => "carbon_dioxide",
        NitrogenDioxide => "nitrogen_dioxide",
        Ammonia => "ammonia",
        Ozone => "ozone",
        SulphurDioxide => "sulphur_dioxide",
        Methane => "methane",
        UvIndex => "uv_index",
        UvIndexClearSky => "uv_index_clear_sky",
        AlderPollen => "alder_pollen",
        BirchPollen => "birch_pollen",
        GrassPollen => "grass_pollen",
        MugwortPollen => "mugwort_pollen",
        OlivePollen => "olive_pollen",
        RagweedPollen => "ragweed_pollen",
        Formaldehyde => "formaldehyde",
        Glyoxal => "glyoxal",
        NonMethaneVolatileOrganicCompounds => "non_methane_volatile_organic_compounds",
        Pm10Wildfires => "pm10_wildfires",
        PeroxyacylNitrates => "peroxyacyl_nitrates",
        SecondaryInorganicAerosol => "secondary_inorganic_aerosol",
        ResidentialElementaryCarbon => "residential_elementary_carbon",
        TotalElementaryCarbon => "total_elementary_carbon",
        Pm2_5TotalOrganicMatter => "pm2_5_total_organic_matter",
        SeaSaltAerosol => "sea_salt_aerosol",
        NitrogenMonoxide => "nitrogen_monoxide",
    }
}

impl GenericVariableMixable for CamsVariable {}

impl RawVariable for CamsVariable {
    fn unit(&self) -> SiUnit {
        use CamsVariable::*;
        match self {
            AerosolOpticalDepth | UvIndex | UvIndexClearSky => SiUnit::Dimensionless,
            CarbonDioxide => SiUnit::PartsPerMillion,
            AlderPollen | BirchPollen | GrassPollen | MugwortPollen | OlivePollen | RagweedPollen => {
                SiUnit::GrainsPerCubicMetre
            }
            _ => SiUnit::MicrogramsPerCubicMetre,
        }
    }

    fn interpolation(&self) -> ReaderInterpolation {
        match self {
            Self::UvIndex | Self::UvIndexClearSky => ReaderInterpolation::SolarBackwardsAveraged,
            _ => ReaderInterpolation::Hermite {
                bounds: Some((0.0, f32::INFINITY)),
            },
        }
    }

    fn is_available_in(&self, dataset: &str) -> bool {
        use CamsVariable::*;
        match dataset.parse::<CamsDomain>() {
            Ok(CamsDomain::Europe) => !matches!(
                self,
                CarbonDioxide | Methane | UvIndex | UvIndexClearSky | AerosolOpticalDepth
            ),
            Ok(CamsDomain::Global) => !matches!(
                self,
                Ammonia
                    | AlderPollen
                    | BirchPollen
                    | GrassPollen
                    | MugwortPollen
                    | OlivePollen
                    | RagweedPollen
                    | NonMethaneVolatileOrganicCompounds
                    | Pm10Wildfires
                    | SecondaryInorganicAerosol
                    | ResidentialElementaryCarbon
                    | TotalElementaryCarbon
                    | Pm2_5TotalOrganicMatter
            ),
            Err(_) => true,
        }
    }
}

pub type CamsReader = GenericReaderCached<CamsDomain, CamsVariable>;

/// CAMS Europe where it covers the location, CAMS global elsewhere.
pub type CamsMixer = GenericReaderMixer<CamsReader>;
