use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================
// Normalized configuration
// ============================================================

/// Where a resolved configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Freshly fetched from the configuration store
    Live,
    /// Served from the in-memory cache
    Cached,
    /// Compiled-in default configuration (store unreachable or record missing)
    Fallback,
}

/// Immutable snapshot of one service's pricing rules for one company.
///
/// Built exclusively by [`normalize`]: every field is fully populated, so
/// calculation code never deals with missing values. Superseded (not mutated)
/// on each cache refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub company_id: String,
    pub service_name: String,
    /// Currency per labor hour
    pub hourly_labor_rate: f64,
    /// Crew members for a standard job
    pub optimal_team_size: u32,
    /// Units of quantity one crew completes per labor-day-equivalent
    pub base_productivity: f64,
    /// Currency per unit quantity
    pub base_material_cost: f64,
    /// Fraction, e.g. 0.20
    pub profit_margin: f64,
    /// Named axes of user choice. BTreeMap so iteration (and therefore
    /// floating-point accumulation order) is deterministic across runs.
    pub variables: BTreeMap<String, Variable>,
    /// Parameters for the excavation sub-formula
    pub excavation: ExcavationParams,
    pub source: ConfigSource,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Select,
    Slider,
}

/// How a variable's selected option feeds into the calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableRole {
    /// `value` is a percentage of Tier1 base hours, applied additively
    LaborPercent,
    /// Cutting/pattern complexity: `fixed_labor_hours` or `labor_percentage`
    /// for hours, `material_waste` for Tier2 waste
    Cutting,
    /// `multiplier` scales the base material cost
    MaterialStyle,
    /// `value` is an overall-complexity percentage applied to the
    /// profit-bearing subtotal
    Complexity,
    /// `value` is a daily equipment rate (pass-through, no markup)
    EquipmentDaily,
    /// `value` is a flat fee (pass-through, no markup)
    FlatFee,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub default: String,
    pub kind: VariableKind,
    pub role: VariableRole,
    pub options: BTreeMap<String, VariableOption>,
}

impl Variable {
    /// Resolve a selected option key, falling back to the variable's declared
    /// default when the key is unknown.
    pub fn resolve<'a>(&'a self, selected: Option<&str>) -> Option<&'a VariableOption> {
        if let Some(key) = selected {
            if let Some(opt) = self.options.get(key) {
                return Some(opt);
            }
            tracing::debug!(
                option = key,
                default = %self.default,
                "Unknown option key, substituting variable default"
            );
        }
        self.options.get(&self.default)
    }
}

/// One selectable choice. All fields are concrete; normalization fills the
/// sparse store representation with neutral defaults.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableOption {
    /// Meaning depends on the variable role: percent-of-base, flat currency,
    /// or daily rate
    pub value: f64,
    /// Material-cost multiplier (neutral = 1.0)
    pub multiplier: f64,
    /// Percentage of base hours (cutting complexity)
    pub labor_percentage: f64,
    /// Material waste percentage
    pub material_waste: f64,
    /// Flat hours added to the total
    pub fixed_labor_hours: f64,
}

impl Default for VariableOption {
    fn default() -> Self {
        Self {
            value: 0.0,
            multiplier: 1.0,
            labor_percentage: 0.0,
            material_waste: 0.0,
            fixed_labor_hours: 0.0,
        }
    }
}

/// Rounding rule for the adjusted excavation volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeRounding {
    /// Round up to a whole volume unit
    Whole,
    /// Round up to a half unit
    Half,
    /// Use the exact adjusted volume
    None,
}

/// Parameters for the excavation hours/cost sub-formula.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcavationParams {
    /// Default excavation depth in inches (caller may override per material)
    pub default_depth_inches: f64,
    /// Extra volume percentage for over-dig / spoil
    pub waste_factor_pct: f64,
    /// Extra volume percentage for soil compaction
    pub compaction_factor_pct: f64,
    /// Currency per cubic yard hauled
    pub base_rate_per_cubic_yard: f64,
    pub profit_margin: f64,
    pub rounding: VolumeRounding,
}

impl Default for ExcavationParams {
    fn default() -> Self {
        Self {
            default_depth_inches: 9.0,
            waste_factor_pct: 10.0,
            compaction_factor_pct: 15.0,
            base_rate_per_cubic_yard: 45.0,
            profit_margin: 0.15,
            rounding: VolumeRounding::Whole,
        }
    }
}

// ============================================================
// Raw store records
// ============================================================

/// Configuration record as stored externally. Every field is optional; the
/// store is free to persist sparse documents. [`normalize`] is the single
/// place where defaults are filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServiceRecord {
    pub hourly_labor_rate: Option<f64>,
    pub optimal_team_size: Option<u32>,
    pub base_productivity: Option<f64>,
    pub base_material_cost: Option<f64>,
    pub profit_margin: Option<f64>,
    #[serde(default)]
    pub variables: BTreeMap<String, RawVariable>,
    pub excavation: Option<RawExcavationParams>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVariable {
    pub default: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, RawOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOption {
    pub value: Option<f64>,
    pub multiplier: Option<f64>,
    pub labor_percentage: Option<f64>,
    pub material_waste: Option<f64>,
    pub fixed_labor_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExcavationParams {
    pub default_depth_inches: Option<f64>,
    pub waste_factor_pct: Option<f64>,
    pub compaction_factor_pct: Option<f64>,
    pub base_rate_per_cubic_yard: Option<f64>,
    pub profit_margin: Option<f64>,
    pub rounding: Option<String>,
}

// ============================================================
// Normalization
// ============================================================

/// Map a variable name to its calculation role when the record does not
/// carry an explicit `role` field.
fn role_for_name(name: &str) -> VariableRole {
    match name {
        "accessDifficulty" | "teamSize" => VariableRole::LaborPercent,
        "cuttingComplexity" => VariableRole::Cutting,
        "materialStyle" => VariableRole::MaterialStyle,
        "overallComplexity" => VariableRole::Complexity,
        "equipmentNeeds" => VariableRole::EquipmentDaily,
        "obstacleRemoval" => VariableRole::FlatFee,
        // Unknown axes behave as labor percentages; a zero value is a no-op
        _ => VariableRole::LaborPercent,
    }
}

fn parse_role(raw: &str) -> Option<VariableRole> {
    match raw {
        "laborPercent" => Some(VariableRole::LaborPercent),
        "cutting" => Some(VariableRole::Cutting),
        "materialStyle" => Some(VariableRole::MaterialStyle),
        "complexity" => Some(VariableRole::Complexity),
        "equipmentDaily" => Some(VariableRole::EquipmentDaily),
        "flatFee" => Some(VariableRole::FlatFee),
        _ => None,
    }
}

/// Convert a raw store record into a fully-populated [`ServiceConfig`].
///
/// Legacy complexity options that carry a direct multiplier (e.g. `1.15`)
/// instead of a percentage are converted here, so calculation code only ever
/// sees the percentage representation.
pub fn normalize(
    company_id: &str,
    service_name: &str,
    raw: RawServiceRecord,
    source: ConfigSource,
) -> ServiceConfig {
    let fallback = builtin_defaults();

    let mut variables = BTreeMap::new();
    for (name, raw_var) in raw.variables {
        let role = raw_var
            .role
            .as_deref()
            .and_then(parse_role)
            .unwrap_or_else(|| role_for_name(&name));

        let kind = match raw_var.kind.as_deref() {
            Some("slider") => VariableKind::Slider,
            _ => VariableKind::Select,
        };

        let mut options = BTreeMap::new();
        for (key, raw_opt) in raw_var.options {
            options.insert(key, normalize_option(raw_opt, role));
        }

        let default = raw_var
            .default
            .or_else(|| options.keys().next().cloned())
            .unwrap_or_default();

        variables.insert(
            name,
            Variable {
                default,
                kind,
                role,
                options,
            },
        );
    }

    ServiceConfig {
        company_id: company_id.to_string(),
        service_name: service_name.to_string(),
        hourly_labor_rate: raw.hourly_labor_rate.unwrap_or(fallback.hourly_labor_rate),
        optimal_team_size: raw.optimal_team_size.unwrap_or(fallback.optimal_team_size),
        base_productivity: raw.base_productivity.unwrap_or(fallback.base_productivity),
        base_material_cost: raw
            .base_material_cost
            .unwrap_or(fallback.base_material_cost),
        profit_margin: raw.profit_margin.unwrap_or(fallback.profit_margin),
        variables,
        excavation: normalize_excavation(raw.excavation),
        source,
        updated_at: raw.updated_at,
    }
}

fn normalize_option(raw: RawOption, role: VariableRole) -> VariableOption {
    let mut opt = VariableOption {
        value: raw.value.unwrap_or(0.0),
        multiplier: raw.multiplier.unwrap_or(1.0),
        labor_percentage: raw.labor_percentage.unwrap_or(0.0),
        material_waste: raw.material_waste.unwrap_or(0.0),
        fixed_labor_hours: raw.fixed_labor_hours.unwrap_or(0.0),
    };

    // Legacy complexity records stored a direct multiplier with no value.
    // Canonical representation is a percentage.
    if role == VariableRole::Complexity && opt.value == 0.0 && opt.multiplier != 1.0 {
        opt.value = (opt.multiplier - 1.0) * 100.0;
        opt.multiplier = 1.0;
    }

    opt
}

fn normalize_excavation(raw: Option<RawExcavationParams>) -> ExcavationParams {
    let defaults = ExcavationParams::default();
    let Some(raw) = raw else {
        return defaults;
    };

    let rounding = match raw.rounding.as_deref() {
        Some("half") => VolumeRounding::Half,
        Some("none") => VolumeRounding::None,
        Some("whole") => VolumeRounding::Whole,
        _ => defaults.rounding,
    };

    ExcavationParams {
        default_depth_inches: raw.default_depth_inches.unwrap_or(defaults.default_depth_inches),
        waste_factor_pct: raw.waste_factor_pct.unwrap_or(defaults.waste_factor_pct),
        compaction_factor_pct: raw
            .compaction_factor_pct
            .unwrap_or(defaults.compaction_factor_pct),
        base_rate_per_cubic_yard: raw
            .base_rate_per_cubic_yard
            .unwrap_or(defaults.base_rate_per_cubic_yard),
        profit_margin: raw.profit_margin.unwrap_or(defaults.profit_margin),
        rounding,
    }
}

// ============================================================
// Fallback configuration
// ============================================================

struct BuiltinDefaults {
    hourly_labor_rate: f64,
    optimal_team_size: u32,
    base_productivity: f64,
    base_material_cost: f64,
    profit_margin: f64,
}

fn builtin_defaults() -> BuiltinDefaults {
    BuiltinDefaults {
        hourly_labor_rate: 25.0,
        optimal_team_size: 3,
        base_productivity: 50.0,
        base_material_cost: 6.50,
        profit_margin: 0.20,
    }
}

/// Compiled-in default configuration, served when the store is unreachable
/// or has no record for the requested identity. Pricing must always be
/// computable; a quote from fallback configuration is marked
/// [`ConfigSource::Fallback`] so callers can surface staleness.
pub fn fallback_config(company_id: &str, service_name: &str) -> ServiceConfig {
    let mut variables = BTreeMap::new();

    variables.insert(
        "accessDifficulty".to_string(),
        percent_variable(
            "moderate",
            &[("easy", 0.0), ("moderate", 15.0), ("difficult", 30.0)],
        ),
    );
    variables.insert(
        "teamSize".to_string(),
        percent_variable(
            "standard",
            &[("reduced", 20.0), ("standard", 0.0), ("extended", -10.0)],
        ),
    );

    let mut cutting = BTreeMap::new();
    cutting.insert(
        "minimal".to_string(),
        VariableOption {
            material_waste: 5.0,
            ..Default::default()
        },
    );
    cutting.insert(
        "moderate".to_string(),
        VariableOption {
            fixed_labor_hours: 4.0,
            material_waste: 10.0,
            ..Default::default()
        },
    );
    cutting.insert(
        "extensive".to_string(),
        VariableOption {
            labor_percentage: 12.0,
            material_waste: 18.0,
            ..Default::default()
        },
    );
    variables.insert(
        "cuttingComplexity".to_string(),
        Variable {
            default: "minimal".to_string(),
            kind: VariableKind::Select,
            role: VariableRole::Cutting,
            options: cutting,
        },
    );

    let mut styles = BTreeMap::new();
    for (key, multiplier) in [("standard", 1.0), ("premium", 1.35), ("designer", 1.75)] {
        styles.insert(
            key.to_string(),
            VariableOption {
                multiplier,
                ..Default::default()
            },
        );
    }
    variables.insert(
        "materialStyle".to_string(),
        Variable {
            default: "standard".to_string(),
            kind: VariableKind::Select,
            role: VariableRole::MaterialStyle,
            options: styles,
        },
    );

    variables.insert(
        "overallComplexity".to_string(),
        Variable {
            default: "standard".to_string(),
            kind: VariableKind::Select,
            role: VariableRole::Complexity,
            options: [("simple", 0.0), ("standard", 0.0), ("complex", 15.0)]
                .into_iter()
                .map(|(key, value)| {
                    (
                        key.to_string(),
                        VariableOption {
                            value,
                            ..Default::default()
                        },
                    )
                })
                .collect(),
        },
    );

    variables.insert(
        "equipmentNeeds".to_string(),
        Variable {
            default: "handTools".to_string(),
            kind: VariableKind::Select,
            role: VariableRole::EquipmentDaily,
            options: [("handTools", 0.0), ("lightMachinery", 180.0), ("heavyMachinery", 420.0)]
                .into_iter()
                .map(|(key, value)| {
                    (
                        key.to_string(),
                        VariableOption {
                            value,
                            ..Default::default()
                        },
                    )
                })
                .collect(),
        },
    );

    variables.insert(
        "obstacleRemoval".to_string(),
        Variable {
            default: "none".to_string(),
            kind: VariableKind::Select,
            role: VariableRole::FlatFee,
            options: [("none", 0.0), ("minor", 250.0), ("major", 850.0)]
                .into_iter()
                .map(|(key, value)| {
                    (
                        key.to_string(),
                        VariableOption {
                            value,
                            ..Default::default()
                        },
                    )
                })
                .collect(),
        },
    );

    let defaults = builtin_defaults();
    ServiceConfig {
        company_id: company_id.to_string(),
        service_name: service_name.to_string(),
        hourly_labor_rate: defaults.hourly_labor_rate,
        optimal_team_size: defaults.optimal_team_size,
        base_productivity: defaults.base_productivity,
        base_material_cost: defaults.base_material_cost,
        profit_margin: defaults.profit_margin,
        variables,
        excavation: ExcavationParams::default(),
        source: ConfigSource::Fallback,
        updated_at: None,
    }
}

fn percent_variable(default: &str, options: &[(&str, f64)]) -> Variable {
    Variable {
        default: default.to_string(),
        kind: VariableKind::Select,
        role: VariableRole::LaborPercent,
        options: options
            .iter()
            .map(|(key, value)| {
                (
                    key.to_string(),
                    VariableOption {
                        value: *value,
                        ..Default::default()
                    },
                )
            })
            .collect(),
    }
}

// ============================================================
// Validation
// ============================================================

/// Sanity-check a normalized configuration. Used by the CLI `config validate`
/// command; the calculation path trusts normalization instead of re-checking.
pub fn validate_config(cfg: &ServiceConfig) -> anyhow::Result<()> {
    if cfg.hourly_labor_rate <= 0.0 {
        anyhow::bail!("hourlyLaborRate must be positive");
    }
    if cfg.optimal_team_size == 0 {
        anyhow::bail!("optimalTeamSize must be at least 1");
    }
    if cfg.base_productivity <= 0.0 {
        anyhow::bail!("baseProductivity must be positive");
    }
    if cfg.base_material_cost < 0.0 {
        anyhow::bail!("baseMaterialCost cannot be negative");
    }
    if !(0.0..1.0).contains(&cfg.profit_margin) {
        anyhow::bail!(
            "profitMargin must be a fraction in [0, 1), got {}",
            cfg.profit_margin
        );
    }

    for (name, variable) in &cfg.variables {
        if variable.options.is_empty() {
            anyhow::bail!("Variable '{}' has no options", name);
        }
        if !variable.options.contains_key(&variable.default) {
            anyhow::bail!(
                "Variable '{}' declares default '{}' which is not an option",
                name,
                variable.default
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_config_is_valid() {
        let cfg = fallback_config("acme", "paverPatio");
        assert!(validate_config(&cfg).is_ok());
        assert_eq!(cfg.source, ConfigSource::Fallback);
        assert_eq!(cfg.optimal_team_size, 3);
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let raw = RawServiceRecord {
            hourly_labor_rate: Some(32.0),
            ..Default::default()
        };

        let cfg = normalize("acme", "paverPatio", raw, ConfigSource::Live);
        assert_eq!(cfg.hourly_labor_rate, 32.0);
        // Unspecified fields take the built-in defaults
        assert_eq!(cfg.base_productivity, 50.0);
        assert_eq!(cfg.profit_margin, 0.20);
        assert_eq!(cfg.source, ConfigSource::Live);
    }

    #[test]
    fn test_normalize_legacy_complexity_multiplier() {
        let mut options = BTreeMap::new();
        options.insert(
            "complex".to_string(),
            RawOption {
                multiplier: Some(1.15),
                ..Default::default()
            },
        );
        let mut variables = BTreeMap::new();
        variables.insert(
            "overallComplexity".to_string(),
            RawVariable {
                default: Some("complex".to_string()),
                options,
                ..Default::default()
            },
        );
        let raw = RawServiceRecord {
            variables,
            ..Default::default()
        };

        let cfg = normalize("acme", "paverPatio", raw, ConfigSource::Live);
        let opt = &cfg.variables["overallComplexity"].options["complex"];
        assert!((opt.value - 15.0).abs() < 1e-9);
        assert_eq!(opt.multiplier, 1.0);
    }

    #[test]
    fn test_normalize_material_multiplier_untouched() {
        let mut options = BTreeMap::new();
        options.insert(
            "premium".to_string(),
            RawOption {
                multiplier: Some(1.35),
                ..Default::default()
            },
        );
        let mut variables = BTreeMap::new();
        variables.insert(
            "materialStyle".to_string(),
            RawVariable {
                default: Some("premium".to_string()),
                options,
                ..Default::default()
            },
        );
        let raw = RawServiceRecord {
            variables,
            ..Default::default()
        };

        let cfg = normalize("acme", "paverPatio", raw, ConfigSource::Live);
        assert_eq!(
            cfg.variables["materialStyle"].options["premium"].multiplier,
            1.35
        );
    }

    #[test]
    fn test_resolve_unknown_option_falls_back_to_default() {
        let cfg = fallback_config("acme", "paverPatio");
        let variable = &cfg.variables["accessDifficulty"];

        let resolved = variable.resolve(Some("no-such-key")).unwrap();
        let default = variable.resolve(Some("moderate")).unwrap();
        assert_eq!(resolved.value, default.value);
    }

    #[test]
    fn test_explicit_role_overrides_name_mapping() {
        let mut variables = BTreeMap::new();
        variables.insert(
            "customAxis".to_string(),
            RawVariable {
                role: Some("flatFee".to_string()),
                default: Some("on".to_string()),
                options: [(
                    "on".to_string(),
                    RawOption {
                        value: Some(100.0),
                        ..Default::default()
                    },
                )]
                .into_iter()
                .collect(),
                ..Default::default()
            },
        );
        let raw = RawServiceRecord {
            variables,
            ..Default::default()
        };

        let cfg = normalize("acme", "paverPatio", raw, ConfigSource::Live);
        assert_eq!(cfg.variables["customAxis"].role, VariableRole::FlatFee);
    }

    #[test]
    fn test_validate_rejects_bad_margin() {
        let mut cfg = fallback_config("acme", "paverPatio");
        cfg.profit_margin = 1.5;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_default_option() {
        let mut cfg = fallback_config("acme", "paverPatio");
        cfg.variables.get_mut("teamSize").unwrap().default = "ghost".to_string();
        assert!(validate_config(&cfg).is_err());
    }
}
