//! Deterministic sample record synthesis
//!
//! Records are drawn from a single [`StdRng`] seeded once per call, and
//! object keys follow schema order, so identical inputs always produce
//! byte-identical output.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::coercion::DATETIME_FORMAT;
use crate::config::EngineConfig;
use chrono::{Duration, NaiveDate, NaiveTime};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recast_schemas::{join_path, FieldFormat, FieldSpec, JsonType, SchemaModel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use tracing::debug;

/// Sample generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Probability that an optional field or object is populated
    pub optional_probability: f64,
    /// Array length bounds when the schema declares none
    pub min_array_items: usize,
    pub max_array_items: usize,
    /// Inclusive window for generated dates
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            optional_probability: 0.8,
            min_array_items: 1,
            max_array_items: 3,
            date_start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            date_end: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap_or_default(),
        }
    }
}

/// Synthesizes records that satisfy a [`SchemaModel`]
#[derive(Debug, Clone)]
pub struct SampleDataGenerator {
    schema: Arc<SchemaModel>,
    options: GeneratorOptions,
}

impl SampleDataGenerator {
    pub fn new(schema: Arc<SchemaModel>) -> Self {
        Self {
            schema,
            options: GeneratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Take generation settings from the `generator` section
    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_options(config.generator.clone())
    }

    /// Generate `count` records from `seed`
    pub fn generate(&self, count: usize, seed: u64) -> Vec<Value> {
        let mut rng = StdRng::seed_from_u64(seed);
        let records: Vec<Value> = (0..count)
            .map(|_| self.object(&self.schema, "", &mut rng))
            .collect();
        debug!(count, seed, "Generated sample records");
        records
    }

    fn object(&self, model: &SchemaModel, parent: &str, rng: &mut StdRng) -> Value {
        let mut out = Map::new();
        for name in model.children(parent) {
            let child = join_path(parent, name);
            if let Some(object) = model.lookup_object(&child) {
                if object.required || self.populate_optional(rng) {
                    out.insert(name.clone(), self.object(model, &child, rng));
                }
            } else if let Some(spec) = model.lookup(&child) {
                if spec.required || self.populate_optional(rng) {
                    out.insert(name.clone(), self.value(spec, name, rng));
                }
            }
        }
        Value::Object(out)
    }

    fn populate_optional(&self, rng: &mut StdRng) -> bool {
        rng.gen_bool(self.options.optional_probability.clamp(0.0, 1.0))
    }

    fn value(&self, spec: &FieldSpec, name: &str, rng: &mut StdRng) -> Value {
        if let Some(allowed) = spec.constraints.enum_values.as_ref().filter(|v| !v.is_empty()) {
            return allowed[rng.gen_range(0..allowed.len())].clone();
        }

        match spec.json_type {
            JsonType::String => Value::String(self.string(spec, name, rng)),
            JsonType::Integer => Value::from(integer(spec, rng)),
            JsonType::Number => number(spec, rng),
            JsonType::Boolean => Value::Bool(rng.gen_bool(0.5)),
            JsonType::Array => self.array(spec, name, rng),
            JsonType::Object => match spec.properties.as_deref() {
                Some(element) => self.object(element, "", rng),
                None => Value::Object(Map::new()),
            },
        }
    }

    fn string(&self, spec: &FieldSpec, name: &str, rng: &mut StdRng) -> String {
        if spec.format.is_temporal() {
            return self.datetime(spec.format, rng);
        }

        let (declared_min, declared_max) = (spec.constraints.min_length, spec.constraints.max_length);
        let fits = |text: &str| {
            let length = text.chars().count();
            declared_min.map_or(true, |m| length >= m) && declared_max.map_or(true, |m| length <= m)
        };
        if let Some(hint) = StringHint::of(name, spec.format) {
            let text = hint.sample(rng);
            if fits(&text) {
                return text;
            }
        }

        let min = declared_min.unwrap_or_else(|| 5.min(declared_max.unwrap_or(usize::MAX)));
        let max = declared_max.unwrap_or(min.max(12)).max(min);
        let length = rng.gen_range(min..=max);
        (0..length)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect()
    }

    fn datetime(&self, format: FieldFormat, rng: &mut StdRng) -> String {
        let days = (self.options.date_end - self.options.date_start).num_days().max(0);
        let date = self.options.date_start + Duration::days(rng.gen_range(0..=days));
        let time = match format {
            FieldFormat::DateTime => {
                NaiveTime::from_num_seconds_from_midnight_opt(rng.gen_range(0..86_400), 0)
                    .unwrap_or(NaiveTime::MIN)
            }
            _ => NaiveTime::MIN,
        };
        date.and_time(time).and_utc().format(DATETIME_FORMAT).to_string()
    }

    fn array(&self, spec: &FieldSpec, name: &str, rng: &mut StdRng) -> Value {
        let Some(item) = spec.item_type.as_deref() else {
            return Value::Array(Vec::new());
        };
        let declared_max = spec.constraints.max_items;
        let min = spec
            .constraints
            .min_items
            .unwrap_or_else(|| self.options.min_array_items.min(declared_max.unwrap_or(usize::MAX)));
        let max = declared_max
            .unwrap_or_else(|| self.options.max_array_items.max(min))
            .max(min);

        let length = rng.gen_range(min..=max);
        Value::Array((0..length).map(|_| self.value(item, name, rng)).collect())
    }
}

const WORDS: &[&str] = &[
    "amber", "harbor", "silent", "river", "garden", "summer", "winter", "story",
    "light", "shadow", "journey", "ocean", "forest", "secret", "golden", "broken",
    "crimson", "echo", "midnight", "wild", "paper", "glass", "stone", "north",
    "hidden", "distant", "bright", "falling", "empire", "signal", "voyage", "quiet",
    "storm", "legend", "mirror", "orbit", "velvet", "island", "winding", "lantern",
];

const CITIES: &[&str] = &[
    "Lisbon", "Toronto", "Osaka", "Nairobi", "Denver", "Melbourne", "Oslo", "Lima",
    "Seoul", "Dublin",
];

const COUNTRIES: &[&str] = &[
    "Portugal", "Canada", "Japan", "Kenya", "United States", "Australia", "Norway",
    "Peru", "South Korea", "Ireland",
];

const DOMAINS: &[&str] = &["com", "org", "net"];

/// Realistic string shapes chosen from the format or the field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringHint {
    Identifier,
    Title,
    Description,
    Email,
    Phone,
    City,
    Country,
    Url,
    Tag,
}

impl StringHint {
    /// Formats win over names; names are matched case-insensitively
    fn of(name: &str, format: FieldFormat) -> Option<Self> {
        match format {
            FieldFormat::Email => return Some(Self::Email),
            FieldFormat::Uri => return Some(Self::Url),
            _ => {}
        }
        if is_identifier(name) {
            return Some(Self::Identifier);
        }

        let lower = name.to_ascii_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["title", "name"]) {
            Some(Self::Title)
        } else if has(&["description"]) {
            Some(Self::Description)
        } else if has(&["email"]) {
            Some(Self::Email)
        } else if has(&["phone"]) {
            Some(Self::Phone)
        } else if has(&["city"]) {
            Some(Self::City)
        } else if has(&["country"]) {
            Some(Self::Country)
        } else if has(&["url", "link"]) {
            Some(Self::Url)
        } else if has(&["tag"]) {
            Some(Self::Tag)
        } else {
            None
        }
    }

    fn sample(self, rng: &mut StdRng) -> String {
        match self {
            Self::Identifier => {
                let bytes: [u8; 16] = rng.gen();
                uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
            }
            Self::Title => sentence(rng, 2, 6),
            Self::Description => {
                let count = rng.gen_range(1..=3);
                (0..count)
                    .map(|_| format!("{}.", sentence(rng, 4, 10)))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            Self::Email => format!(
                "{}.{}@example.{}",
                pick(rng, WORDS),
                pick(rng, WORDS),
                pick(rng, DOMAINS)
            ),
            Self::Phone => format!(
                "+1-555-{:03}-{:04}",
                rng.gen_range(0..1000),
                rng.gen_range(0..10000)
            ),
            Self::City => pick(rng, CITIES).to_string(),
            Self::Country => pick(rng, COUNTRIES).to_string(),
            Self::Url => format!(
                "https://www.{}.{}/{}",
                pick(rng, WORDS),
                pick(rng, DOMAINS),
                pick(rng, WORDS)
            ),
            Self::Tag => pick(rng, WORDS).to_string(),
        }
    }
}

fn pick<'a>(rng: &mut StdRng, words: &[&'a str]) -> &'a str {
    words[rng.gen_range(0..words.len())]
}

/// Capitalized words without a trailing period
fn sentence(rng: &mut StdRng, min_words: usize, max_words: usize) -> String {
    let count = rng.gen_range(min_words..=max_words);
    let mut words: Vec<String> = (0..count).map(|_| pick(rng, WORDS).to_string()).collect();
    if let Some(first) = words.first_mut() {
        let mut chars = first.chars();
        let capitalized: String = match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        *first = capitalized;
    }
    words.join(" ")
}

/// `id`, `*_id`, `*-id` and camel-case `*Id` names get UUIDs
fn is_identifier(name: &str) -> bool {
    name.eq_ignore_ascii_case("id")
        || name.to_ascii_lowercase().ends_with("_id")
        || name.to_ascii_lowercase().ends_with("-id")
        || name.ends_with("Id")
}

/// Bounds are inclusive; schema parsing rejects ranges with no integer
fn integer(spec: &FieldSpec, rng: &mut StdRng) -> i64 {
    let lower = spec.constraints.minimum.map(|m| m.ceil() as i64);
    let upper = spec.constraints.maximum.map(|m| m.floor() as i64);
    let (min, max) = match (lower, upper) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min.saturating_add(1000)),
        (None, Some(max)) if max >= 0 => (0, max),
        (None, Some(max)) => (max.saturating_sub(1000), max),
        (None, None) => (0, 1000),
    };
    rng.gen_range(min..=max.max(min))
}

fn number(spec: &FieldSpec, rng: &mut StdRng) -> Value {
    let (min, max) = match (spec.constraints.minimum, spec.constraints.maximum) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min + 1000.0),
        (None, Some(max)) if max >= 0.0 => (0.0, max),
        (None, Some(max)) => (max - 1000.0, max),
        (None, None) => (0.0, 1000.0),
    };
    let max = max.max(min);
    let raw = min + rng.gen::<f64>() * (max - min);
    let rounded = ((raw * 100.0).round() / 100.0).clamp(min, max);
    Number::from_f64(rounded)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0))
}

/// Generate records with default options
pub fn generate(schema: &SchemaModel, count: usize, seed: u64) -> Vec<Value> {
    SampleDataGenerator::new(Arc::new(schema.clone())).generate(count, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;
    use serde_json::json;

    fn schema() -> SchemaModel {
        SchemaModel::parse(&json!({
            "type": "object",
            "required": ["id", "title", "genre"],
            "properties": {
                "id": {"type": "string"},
                "title": {"type": "string", "minLength": 3, "maxLength": 8},
                "genre": {"type": "array", "items": {"type": "string", "enum": ["Comedy", "Drama"]}},
                "year": {"type": "integer", "minimum": 1990, "maximum": 2000},
                "score": {"type": "number", "minimum": 0, "maximum": 10},
                "release_date": {"type": "string", "format": "date"},
                "tags": {"type": "array", "items": {"type": "string"}, "minItems": 4, "maxItems": 5},
                "rating": {
                    "type": "object",
                    "required": ["mpaa_rating"],
                    "properties": {"mpaa_rating": {"type": "string", "enum": ["G", "PG"]}}
                },
                "video": {"type": "string", "maxLength": 6}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_deterministic() {
        let model = schema();
        let first = serde_json::to_string(&generate(&model, 20, 7)).unwrap();
        let second = serde_json::to_string(&generate(&model, 20, 7)).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, serde_json::to_string(&generate(&model, 20, 8)).unwrap());
    }

    #[test]
    fn test_samples_validate_cleanly() {
        let model = Arc::new(schema());
        let validator = Validator::new(model.clone());
        for record in SampleDataGenerator::new(model).generate(50, 42) {
            let report = validator.validate(&record);
            assert!(report.is_valid(), "{:?}", report.errors);
            assert!(!report.has_warnings(), "{:?}", report.warnings);
        }
    }

    #[test]
    fn test_required_always_present() {
        for record in generate(&schema(), 50, 3) {
            assert!(record.get("id").is_some());
            assert!(record.get("title").is_some());
            assert!(record.get("genre").is_some());
        }
    }

    #[test]
    fn test_identifiers_are_uuids() {
        for record in generate(&schema(), 5, 11) {
            let id = record["id"].as_str().unwrap();
            assert!(uuid::Uuid::parse_str(id).is_ok());
            if let Some(video) = record.get("video") {
                assert!(video.as_str().unwrap().len() <= 6);
            }
        }
    }

    #[test]
    fn test_dates_within_window() {
        let options = GeneratorOptions::default();
        for record in generate(&schema(), 50, 5) {
            if let Some(date) = record.get("release_date").and_then(Value::as_str) {
                let parsed = NaiveDate::parse_from_str(&date[..10], "%Y-%m-%d").unwrap();
                assert!(parsed >= options.date_start && parsed <= options.date_end);
                assert!(date.ends_with("T00:00:00Z"));
            }
        }
    }

    #[test]
    fn test_short_max_length_and_one_sided_bounds() {
        let model = Arc::new(
            SchemaModel::parse(&json!({
                "type": "object",
                "required": ["code", "delta", "offset", "tiny"],
                "properties": {
                    "code": {"type": "string", "maxLength": 3},
                    "tiny": {"type": "string", "maxLength": 0},
                    "delta": {"type": "integer", "maximum": -10},
                    "offset": {"type": "number", "maximum": -0.5}
                }
            }))
            .unwrap(),
        );
        let validator = Validator::new(model.clone());
        for record in SampleDataGenerator::new(model).generate(40, 1) {
            let report = validator.validate(&record);
            assert!(report.is_valid(), "{record}: {:?}", report.errors);
            assert!(record["code"].as_str().unwrap().len() <= 3);
            assert_eq!(record["tiny"], json!(""));
        }
    }

    fn hinted_schema() -> Arc<SchemaModel> {
        Arc::new(
            SchemaModel::parse(&json!({
                "type": "object",
                "required": ["title", "description", "contact", "homepage", "trailer_link", "tags", "city", "phone", "video"],
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "contact": {"type": "string", "format": "email"},
                    "homepage": {"type": "string", "format": "uri"},
                    "trailer_link": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "city": {"type": "string"},
                    "phone": {"type": "string"},
                    "video": {"type": "string"}
                }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_name_and_format_hints() {
        let generator = SampleDataGenerator::new(hinted_schema());
        let records = generator.generate(20, 99);
        assert_eq!(
            serde_json::to_string(&records).unwrap(),
            serde_json::to_string(&generator.generate(20, 99)).unwrap()
        );

        for record in &records {
            let text = |key: &str| record[key].as_str().unwrap().to_string();

            let title = text("title");
            assert!((2..=6).contains(&title.split(' ').count()), "{title}");
            assert!(title.chars().next().unwrap().is_uppercase());
            assert!(!title.ends_with('.'));
            assert!(text("description").ends_with('.'));
            assert!(text("contact").contains("@example."));
            assert!(text("homepage").starts_with("https://www."));
            assert!(text("trailer_link").starts_with("https://www."));
            assert!(CITIES.contains(&text("city").as_str()));
            assert!(text("phone").starts_with("+1-555-"));
            for tag in record["tags"].as_array().unwrap() {
                assert!(WORDS.contains(&tag.as_str().unwrap()));
            }
            assert!(text("video").chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_hint_falls_back_when_too_long() {
        let model = Arc::new(
            SchemaModel::parse(&json!({
                "type": "object",
                "required": ["name"],
                "properties": {"name": {"type": "string", "maxLength": 4}}
            }))
            .unwrap(),
        );
        for record in SampleDataGenerator::new(model).generate(20, 4) {
            assert!(record["name"].as_str().unwrap().len() <= 4);
        }
    }

    #[test]
    fn test_config_section_drives_options() {
        let mut config = EngineConfig::default();
        config.generator.optional_probability = 0.0;
        let records = SampleDataGenerator::new(Arc::new(schema()))
            .with_config(&config)
            .generate(3, 1);
        for record in records {
            assert_eq!(record.as_object().unwrap().len(), 3);
        }
    }

    #[test]
    fn test_optional_probability_zero() {
        let options = GeneratorOptions {
            optional_probability: 0.0,
            ..Default::default()
        };
        let records = SampleDataGenerator::new(Arc::new(schema()))
            .with_options(options)
            .generate(3, 1);
        for record in records {
            let keys: Vec<&String> = record.as_object().unwrap().keys().collect();
            assert_eq!(keys, vec!["id", "title", "genre"]);
        }
    }
}
