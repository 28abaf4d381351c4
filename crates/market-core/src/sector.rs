//! Fixed sector and sub-industry vocabulary.

use serde::{Deserialize, Serialize};

/// Top-level industry classification of a listed entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sector {
    Technology,
    Healthcare,
    Energy,
    Financials,
    Consumer,
    Industrials,
    Communication,
    Materials,
}

impl Sector {
    /// Every sector, in declaration order.
    pub const ALL: [Sector; 8] = [
        Sector::Technology,
        Sector::Healthcare,
        Sector::Energy,
        Sector::Financials,
        Sector::Consumer,
        Sector::Industrials,
        Sector::Communication,
        Sector::Materials,
    ];

    /// Display name, also the source of the ticker prefix.
    pub fn label(self) -> &'static str {
        match self {
            Sector::Technology => "Technology",
            Sector::Healthcare => "Healthcare",
            Sector::Energy => "Energy",
            Sector::Financials => "Financials",
            Sector::Consumer => "Consumer",
            Sector::Industrials => "Industrials",
            Sector::Communication => "Communication",
            Sector::Materials => "Materials",
        }
    }

    /// Leading character of every ticker issued in this sector.
    pub fn ticker_prefix(self) -> char {
        match self {
            Sector::Technology => 'T',
            Sector::Healthcare => 'H',
            Sector::Energy => 'E',
            Sector::Financials => 'F',
            Sector::Consumer => 'C',
            Sector::Industrials => 'I',
            Sector::Communication => 'C',
            Sector::Materials => 'M',
        }
    }

    /// Sub-industries belonging to this sector.
    pub fn sub_industries(self) -> &'static [SubIndustry] {
        use SubIndustry::*;
        match self {
            Sector::Technology => &[Cloud, Semiconductors, AiHardware, Saas, Cybersecurity],
            Sector::Healthcare => &[Biotech, Pharmaceuticals, MedicalDevices, Payors],
            Sector::Energy => &[ExplorationProduction, Renewables, Midstream, EnergyServices],
            Sector::Financials => &[Banks, Fintech, AssetManagement, Insurance],
            Sector::Consumer => &[Retail, Luxury, Staples, ECommerce],
            Sector::Industrials => &[Aerospace, Logistics, Infrastructure, Manufacturing],
            Sector::Communication => &[Telco, SocialMedia, Streaming, Advertising],
            Sector::Materials => &[Mining, Chemicals, Forestry, Steel],
        }
    }
}

/// Second-level classification; each belongs to exactly one [`Sector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubIndustry {
    Cloud,
    Semiconductors,
    #[serde(rename = "AI Hardware")]
    AiHardware,
    #[serde(rename = "SaaS")]
    Saas,
    Cybersecurity,
    Biotech,
    Pharmaceuticals,
    #[serde(rename = "Medical Devices")]
    MedicalDevices,
    Payors,
    #[serde(rename = "E&P")]
    ExplorationProduction,
    Renewables,
    Midstream,
    #[serde(rename = "Services")]
    EnergyServices,
    Banks,
    Fintech,
    #[serde(rename = "Asset Management")]
    AssetManagement,
    Insurance,
    Retail,
    Luxury,
    Staples,
    #[serde(rename = "E-commerce")]
    ECommerce,
    Aerospace,
    Logistics,
    Infrastructure,
    Manufacturing,
    Telco,
    #[serde(rename = "Social Media")]
    SocialMedia,
    Streaming,
    Advertising,
    Mining,
    Chemicals,
    Forestry,
    Steel,
}

impl SubIndustry {
    /// Display name used in entity names.
    pub fn label(self) -> &'static str {
        use SubIndustry::*;
        match self {
            Cloud => "Cloud",
            Semiconductors => "Semiconductors",
            AiHardware => "AI Hardware",
            Saas => "SaaS",
            Cybersecurity => "Cybersecurity",
            Biotech => "Biotech",
            Pharmaceuticals => "Pharmaceuticals",
            MedicalDevices => "Medical Devices",
            Payors => "Payors",
            ExplorationProduction => "E&P",
            Renewables => "Renewables",
            Midstream => "Midstream",
            EnergyServices => "Services",
            Banks => "Banks",
            Fintech => "Fintech",
            AssetManagement => "Asset Management",
            Insurance => "Insurance",
            Retail => "Retail",
            Luxury => "Luxury",
            Staples => "Staples",
            ECommerce => "E-commerce",
            Aerospace => "Aerospace",
            Logistics => "Logistics",
            Infrastructure => "Infrastructure",
            Manufacturing => "Manufacturing",
            Telco => "Telco",
            SocialMedia => "Social Media",
            Streaming => "Streaming",
            Advertising => "Advertising",
            Mining => "Mining",
            Chemicals => "Chemicals",
            Forestry => "Forestry",
            Steel => "Steel",
        }
    }

    /// Owning sector.
    pub fn sector(self) -> Sector {
        Sector::ALL
            .into_iter()
            .find(|s| s.sub_industries().contains(&self))
            .unwrap_or(Sector::Technology)
    }
}
