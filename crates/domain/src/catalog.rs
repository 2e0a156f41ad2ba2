//! The customization catalog: the five closed option sets and their
//! per-option surcharge, inventory code and production weights.
//!
//! This is the single canonical table. Both the production payload builder
//! and the inventory deduction path (see [`crate::mapper`]) read from here,
//! so the two can never drift apart. Every lookup is an exhaustive `match`
//! over the enums; unrecognized option names are rejected at parse time
//! with the offending step named.

use common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the five customization steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Style,
    Material,
    Sole,
    Color,
    LaceDetail,
}

impl Step {
    /// Returns the step name as used in requests and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Style => "style",
            Step::Material => "material",
            Step::Sole => "sole",
            Step::Color => "color",
            Step::LaceDetail => "laceDetail",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors produced while turning raw option strings into a [`SneakerConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// One or more steps were absent from the request.
    #[error("missing required step(s): {}", .steps.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "))]
    MissingSteps { steps: Vec<Step> },

    /// A step carried a value outside its closed option set.
    #[error("unknown {step} option: {value:?}")]
    UnknownOption { step: Step, value: String },
}

/// Sneaker style. Drives the number of assembly blocks in the production
/// payload and the style inventory deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Style {
    Casual,
    Corrida,
    Skate,
}

impl Style {
    /// Customer-facing option name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Casual => "Casual",
            Style::Corrida => "Corrida",
            Style::Skate => "Skate",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Casual" => Some(Style::Casual),
            "Corrida" => Some(Style::Corrida),
            "Skate" => Some(Style::Skate),
            _ => None,
        }
    }

    /// Inventory code for the style block component.
    pub fn code(&self) -> &'static str {
        match self {
            Style::Casual => "B1",
            Style::Corrida => "B2",
            Style::Skate => "B3",
        }
    }

    /// Number of assembly blocks the machine builds for this style.
    /// Also the number of style-block units deducted from inventory.
    pub fn block_count(&self) -> u32 {
        match self {
            Style::Casual => 1,
            Style::Corrida => 2,
            Style::Skate => 3,
        }
    }

    /// Surcharge this option adds to the item price.
    pub fn surcharge(&self) -> Money {
        match self {
            Style::Casual => Money::from_cents(20_000),
            Style::Corrida => Money::from_cents(26_000),
            Style::Skate => Money::from_cents(30_000),
        }
    }
}

/// Upper material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Couro,
    Camurca,
    Lona,
    Sintetico,
}

impl Material {
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Couro => "Couro",
            Material::Camurca => "Camurça",
            Material::Lona => "Lona",
            Material::Sintetico => "Sintético",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Couro" => Some(Material::Couro),
            "Camurça" => Some(Material::Camurca),
            "Lona" => Some(Material::Lona),
            "Sintético" => Some(Material::Sintetico),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Material::Couro => "M1",
            Material::Camurca => "M2",
            Material::Lona => "M3",
            Material::Sintetico => "M4",
        }
    }

    pub fn surcharge(&self) -> Money {
        match self {
            Material::Couro => Money::from_cents(10_000),
            Material::Camurca => Money::from_cents(8_000),
            Material::Lona => Money::from_cents(6_000),
            Material::Sintetico => Money::from_cents(5_000),
        }
    }
}

/// Sole compound. The sole code fills all three tread pattern slots of
/// every assembly block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sole {
    Borracha,
    Eva,
    Tratorada,
}

impl Sole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sole::Borracha => "Borracha",
            Sole::Eva => "EVA",
            Sole::Tratorada => "Tratorada",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Borracha" => Some(Sole::Borracha),
            "EVA" => Some(Sole::Eva),
            "Tratorada" => Some(Sole::Tratorada),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Sole::Borracha => "S1",
            Sole::Eva => "S2",
            Sole::Tratorada => "S3",
        }
    }

    pub fn surcharge(&self) -> Money {
        match self {
            Sole::Borracha => Money::from_cents(4_000),
            Sole::Eva => Money::from_cents(5_000),
            Sole::Tratorada => Money::from_cents(6_000),
        }
    }
}

/// Base color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Branco,
    Preto,
    Vermelho,
    Azul,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Branco => "Branco",
            Color::Preto => "Preto",
            Color::Vermelho => "Vermelho",
            Color::Azul => "Azul",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Branco" => Some(Color::Branco),
            "Preto" => Some(Color::Preto),
            "Vermelho" => Some(Color::Vermelho),
            "Azul" => Some(Color::Azul),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Color::Branco => "L1",
            Color::Preto => "L2",
            Color::Vermelho => "L3",
            Color::Azul => "L4",
        }
    }

    pub fn surcharge(&self) -> Money {
        match self {
            Color::Branco | Color::Preto => Money::from_cents(2_000),
            Color::Vermelho | Color::Azul => Money::from_cents(2_500),
        }
    }
}

/// Lace finish. Its weight determines how many blade color sub-fields
/// each assembly block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaceDetail {
    CadarcoNormal,
    CadarcoColorido,
    SemCadarco,
}

impl LaceDetail {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaceDetail::CadarcoNormal => "Cadarço normal",
            LaceDetail::CadarcoColorido => "Cadarço colorido",
            LaceDetail::SemCadarco => "Sem cadarço",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Cadarço normal" => Some(LaceDetail::CadarcoNormal),
            "Cadarço colorido" => Some(LaceDetail::CadarcoColorido),
            "Sem cadarço" => Some(LaceDetail::SemCadarco),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LaceDetail::CadarcoNormal => "D1",
            LaceDetail::CadarcoColorido => "D2",
            LaceDetail::SemCadarco => "D3",
        }
    }

    /// Number of blade color sub-fields per assembly block.
    pub fn blade_count(&self) -> u32 {
        match self {
            LaceDetail::CadarcoNormal => 3,
            LaceDetail::CadarcoColorido => 2,
            LaceDetail::SemCadarco => 1,
        }
    }

    pub fn surcharge(&self) -> Money {
        match self {
            LaceDetail::CadarcoNormal => Money::from_cents(2_000),
            LaceDetail::CadarcoColorido => Money::from_cents(3_000),
            LaceDetail::SemCadarco => Money::from_cents(1_000),
        }
    }
}

/// A validated five-step sneaker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SneakerConfig {
    pub style: Style,
    pub material: Material,
    pub sole: Sole,
    pub color: Color,
    pub lace_detail: LaceDetail,
}

impl SneakerConfig {
    /// Builds a configuration from raw, possibly-absent option strings.
    ///
    /// All missing steps are collected and reported together; unknown
    /// option values are reported with the step they belong to.
    pub fn from_raw(
        style: Option<&str>,
        material: Option<&str>,
        sole: Option<&str>,
        color: Option<&str>,
        lace_detail: Option<&str>,
    ) -> Result<Self, CatalogError> {
        let mut missing = Vec::new();
        if style.is_none() {
            missing.push(Step::Style);
        }
        if material.is_none() {
            missing.push(Step::Material);
        }
        if sole.is_none() {
            missing.push(Step::Sole);
        }
        if color.is_none() {
            missing.push(Step::Color);
        }
        if lace_detail.is_none() {
            missing.push(Step::LaceDetail);
        }
        if !missing.is_empty() {
            return Err(CatalogError::MissingSteps { steps: missing });
        }

        let unknown = |step: Step, value: &str| CatalogError::UnknownOption {
            step,
            value: value.to_string(),
        };

        let style = style.unwrap();
        let material = material.unwrap();
        let sole = sole.unwrap();
        let color = color.unwrap();
        let lace_detail = lace_detail.unwrap();

        Ok(Self {
            style: Style::parse(style).ok_or_else(|| unknown(Step::Style, style))?,
            material: Material::parse(material).ok_or_else(|| unknown(Step::Material, material))?,
            sole: Sole::parse(sole).ok_or_else(|| unknown(Step::Sole, sole))?,
            color: Color::parse(color).ok_or_else(|| unknown(Step::Color, color))?,
            lace_detail: LaceDetail::parse(lace_detail)
                .ok_or_else(|| unknown(Step::LaceDetail, lace_detail))?,
        })
    }

    /// Item price: the sum of the five per-option surcharges.
    pub fn price(&self) -> Money {
        self.style.surcharge()
            + self.material.surcharge()
            + self.sole.surcharge()
            + self.color.surcharge()
            + self.lace_detail.surcharge()
    }
}
