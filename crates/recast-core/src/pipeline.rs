//! Record pipeline: mapping, coercion, validation and flattening
//!
//! A [`Pipeline`] owns shared, immutable stage configuration and can be used
//! from many threads at once. Batches are split into contiguous shards that
//! run on scoped worker threads; outputs are reassembled in input order and
//! per-record reports are merged once every shard has finished.
//!
//! Copyright (c) 2025 Recast Team
//! Licensed under the Apache-2.0 license

use crate::coercion::TypeCoercer;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::flatten::{flatten, FlattenOptions};
use crate::logging::timing::Timer;
use crate::mapper::{FieldMapper, FieldMapping, MappingOptions};
use crate::report::{Issue, ValidationReport};
use crate::validator::{ValidationMode, Validator};
use recast_schemas::SchemaModel;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// One processed record and its report
#[derive(Debug, Clone, PartialEq)]
pub struct Processed {
    pub record: Value,
    pub report: ValidationReport,
}

/// Processed batch: records in input order plus the aggregate report
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    pub records: Vec<Value>,
    pub report: ValidationReport,
}

/// Configured chain of record stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    schema: Arc<SchemaModel>,
    mapper: Option<FieldMapper>,
    coercer: Option<TypeCoercer>,
    validator: Option<Validator>,
    mode: ValidationMode,
    flatten: Option<FlattenOptions>,
    workers: usize,
}

impl Pipeline {
    pub fn builder(schema: Arc<SchemaModel>) -> PipelineBuilder {
        PipelineBuilder::new(schema)
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    /// Run every configured stage over one record
    pub fn process(&self, record: Value) -> Processed {
        let mut report = ValidationReport::new();

        let mut record = match &self.mapper {
            Some(mapper) => {
                let mapped = mapper.map(record);
                report.absorb(mapped.report);
                mapped.record
            }
            None => record,
        };

        if let Some(coercer) = &self.coercer {
            let (coerced, stage) = coercer.coerce_record(record, &self.schema);
            report.absorb(stage);
            record = coerced;
        }

        if let Some(validator) = &self.validator {
            report.absorb_new(validator.check(&record));
        }

        if self.mode == ValidationMode::Strict {
            report.escalate_warnings();
        }

        // A colliding record stays nested and fails
        if let Some(options) = &self.flatten {
            match flatten(&record, options) {
                Ok(flat) => record = flat,
                Err(collision) => {
                    warn!(error = %collision, "Record cannot be flattened");
                    report.add_error(Issue::new("$", collision.to_string()));
                }
            }
        }

        Processed {
            record,
            report: report.seal(),
        }
    }

    /// Process a batch; per-record failures never abort the batch
    pub fn process_batch(&self, records: Vec<Value>) -> BatchOutput {
        let timer = Timer::new("process_batch", records.len());
        let workers = self.workers.clamp(1, records.len().max(1));

        let processed: Vec<Processed> = if workers == 1 {
            records.into_iter().map(|r| self.process(r)).collect()
        } else {
            self.process_sharded(records, workers)
        };

        let mut output = BatchOutput {
            records: Vec::with_capacity(processed.len()),
            report: ValidationReport::new(),
        };
        for (index, item) in processed.into_iter().enumerate() {
            output.records.push(item.record);
            output.report.merge_record(index, item.report);
        }

        let stats = output.report.stats;
        let elapsed = timer.finish();
        info!(
            processed = stats.processed,
            passed = stats.passed,
            failed = stats.failed,
            with_warnings = stats.with_warnings,
            workers,
            duration_ms = elapsed.as_millis() as u64,
            "Processed batch"
        );
        output
    }

    fn process_sharded(&self, records: Vec<Value>, workers: usize) -> Vec<Processed> {
        let shard_size = records.len().div_ceil(workers);
        let mut shards: Vec<Vec<Value>> = Vec::with_capacity(workers);
        let mut remaining = records.into_iter();
        loop {
            let shard: Vec<Value> = remaining.by_ref().take(shard_size).collect();
            if shard.is_empty() {
                break;
            }
            shards.push(shard);
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = shards
                .into_iter()
                .map(|shard| {
                    scope.spawn(move || {
                        shard
                            .into_iter()
                            .map(|r| self.process(r))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

/// Builder for [`Pipeline`]s
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    schema: Arc<SchemaModel>,
    mapping: Option<Arc<FieldMapping>>,
    mapping_options: MappingOptions,
    coercer: TypeCoercer,
    coerce: bool,
    validate: bool,
    mode: ValidationMode,
    flatten: Option<FlattenOptions>,
    workers: usize,
}

impl PipelineBuilder {
    pub fn new(schema: Arc<SchemaModel>) -> Self {
        Self {
            schema,
            mapping: None,
            mapping_options: MappingOptions::default(),
            coercer: TypeCoercer::new(),
            coerce: true,
            validate: true,
            mode: ValidationMode::Lenient,
            flatten: None,
            workers: 1,
        }
    }

    /// Apply every section of an [`EngineConfig`]
    pub fn config(mut self, config: &EngineConfig) -> Self {
        self.coercer = TypeCoercer::with_options(config.coercion.options.clone());
        self.coerce = config.coercion.enabled;
        self.mapping_options = config.mapping.clone();
        self.validate = config.validation.enabled;
        self.mode = config.validation.mode;
        self.flatten = config
            .flatten
            .enabled
            .then(|| config.flatten.options.clone());
        self.workers = config.batch.workers;
        self
    }

    pub fn mapping(mut self, mapping: FieldMapping) -> Self {
        self.mapping = Some(Arc::new(mapping));
        self
    }

    pub fn shared_mapping(mut self, mapping: Arc<FieldMapping>) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn mapping_options(mut self, options: MappingOptions) -> Self {
        self.mapping_options = options;
        self
    }

    pub fn coercer(mut self, coercer: TypeCoercer) -> Self {
        self.coercer = coercer;
        self
    }

    pub fn coerce(mut self, enabled: bool) -> Self {
        self.coerce = enabled;
        self
    }

    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    pub fn mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn flatten(mut self, options: FlattenOptions) -> Self {
        self.flatten = Some(options);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Check the mapping against the configured guards and assemble the
    /// pipeline
    pub fn build(self) -> Result<Pipeline> {
        let mapper = match self.mapping {
            Some(mapping) => {
                mapping.check(&self.mapping_options)?;
                let mapping = match &self.mapping_options.preserve_original {
                    Some(target) if mapping.preserve_original().is_none() => {
                        Arc::new((*mapping).clone().with_preserve_original(target.clone()))
                    }
                    _ => mapping,
                };
                Some(FieldMapper::new(mapping).with_coercer(self.coercer.clone()))
            }
            None => None,
        };

        let validator = self.validate.then(|| {
            Validator::new(self.schema.clone())
                .with_coercer(self.coercer.clone())
                .with_mode(self.mode)
        });

        Ok(Pipeline {
            mapper,
            coercer: self.coerce.then_some(self.coercer),
            validator,
            mode: self.mode,
            flatten: self.flatten,
            workers: self.workers,
            schema: self.schema,
        })
    }
}
