//! The `vary` pipeline over one document: generate samples, train the
//! tree, answer partial-configuration queries, render single
//! configurations.

use std::path::PathBuf;

use vary_explore::generate::{generate_batch, generate_parallel, BatchReport, GenerateError};
use vary_ir::merge::ensure_schema_file;
use vary_ir::types::{Configuration, ConfigurationSchema, NumberDomain};
use vary_ir::{load_schema, SchemaError};
use vary_model::dot::write_visualization;
use vary_model::store::{SampleStore, StoreError};
use vary_model::train::{train, TargetConstraint, TrainError, TrainedModel};
use vary_sandbox::inject::{self, InjectError};
use vary_sandbox::render::{CommandRenderer, RenderError, Renderer};

use crate::config::VaryConfig;
use crate::infer::{InferenceContext, InferenceError};
use crate::report::InferenceReport;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("instrumentation error: {0}")]
    Inject(#[from] InjectError),

    #[error("generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("sample store error: {0}")]
    Store(#[from] StoreError),

    #[error("training error: {0}")]
    Train(#[from] TrainError),

    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no maximum page count configured")]
    MissingMaxPages,
}

/// Turn the document's graphics sizes and item spacing into numeric
/// variables. Rewrites the sources in place and extends the variables file.
pub fn instrument(config: &VaryConfig, graphics: bool, itemsep: bool) -> Result<Vec<NumberDomain>, SessionError> {
    let schema_path = config.schema_path();
    let main_tex = config.main_tex_path();
    ensure_schema_file(&schema_path)?;
    inject::write_macros(&config.source_dir)?;
    inject::ensure_value_includes(&main_tex)?;

    let mut added = Vec::new();
    if graphics {
        added.extend(inject::register_graphics_variables(&main_tex, &schema_path)?);
    }
    if itemsep && inject::register_itemsep_variable(&main_tex, &schema_path)? {
        added.push(NumberDomain {
            name: "itemsep".to_string(),
            min: -5.0,
            max: 5.0,
            precision: 1,
        });
    }
    Ok(added)
}

pub struct Session {
    config: VaryConfig,
    schema: ConfigurationSchema,
}

impl Session {
    /// Load the variables file of the configured document.
    pub fn open(config: VaryConfig) -> Result<Self, SessionError> {
        let schema = load_schema(config.schema_path())?;
        log::info!(
            "{} booleans, {} numbers, {} enums, {} choice groups",
            schema.booleans.len(),
            schema.numbers.len(),
            schema.enums.len(),
            schema.choices.len()
        );
        Ok(Self { config, schema })
    }

    pub fn config(&self) -> &VaryConfig {
        &self.config
    }

    pub fn schema(&self) -> &ConfigurationSchema {
        &self.schema
    }

    fn target(&self) -> Result<TargetConstraint, SessionError> {
        let max_pages = self.config.max_pages.ok_or(SessionError::MissingMaxPages)?;
        Ok(TargetConstraint { max_pages })
    }

    pub fn prepare_renderer(&self) -> Result<CommandRenderer, SessionError> {
        Ok(CommandRenderer::prepare(&self.config.source_dir, self.config.render.clone())?)
    }

    /// Render `generations` random configurations, keeping `fixed` values,
    /// and append them to the sample table.
    pub fn generate(&self, fixed: &Configuration) -> Result<BatchReport, SessionError> {
        let renderer = self.prepare_renderer()?;
        self.generate_with(&renderer, fixed)
    }

    /// [`Session::generate`] with a caller-provided renderer.
    pub fn generate_with<R: Renderer + Sync>(
        &self,
        renderer: &R,
        fixed: &Configuration,
    ) -> Result<BatchReport, SessionError> {
        let path = self.config.samples_path();
        let mut store = SampleStore::open(&path, &self.schema, self.config.reset)?;
        let mut rng = rand::thread_rng();
        let count = self.config.generations;
        let source = self.config.space_source;

        let report = if self.config.parallel {
            generate_parallel(renderer, &self.schema, fixed, count, source, &mut store, &mut rng)?
        } else {
            generate_batch(renderer, &self.schema, fixed, count, source, &mut store, &mut rng)?
        };
        store.export(&path)?;
        log::info!("{} samples in {}", store.len(), path.display());
        Ok(report)
    }

    /// Train on the sample table and write the tree visualization.
    pub fn train(&self) -> Result<TrainedModel, SessionError> {
        let target = self.target()?;
        let store = SampleStore::load(&self.config.samples_path(), &self.schema)?;
        let model = train(&store, self.config.train_size, &target)?;
        write_visualization(
            &model.tree,
            &model.features,
            &self.config.output_dir,
            self.config.dot_command.as_deref(),
        )?;
        Ok(model)
    }

    /// Probabilities of satisfying the page constraint around `partial`,
    /// from a tree trained on every sample.
    pub fn predict(&self, partial: &Configuration) -> Result<InferenceReport, SessionError> {
        let target = self.target()?;
        let store = SampleStore::load(&self.config.samples_path(), &self.schema)?;
        let model = train(&store, 100.0, &target)?;
        let context = InferenceContext::new(model, self.schema.clone(), true);
        Ok(context.evaluate_options(partial)?)
    }

    /// Render one configuration and copy its PDF into the output directory.
    pub fn render(&self, config: &Configuration) -> Result<PathBuf, SessionError> {
        let renderer = self.prepare_renderer()?;
        let doc = renderer.render(config)?;
        log::info!("rendered {} pages", doc.page_count);

        std::fs::create_dir_all(&self.config.output_dir)?;
        let target = self.config.output_dir.join(self.config.render.pdf_file());
        std::fs::copy(renderer.pdf_path(), &target)?;
        Ok(target)
    }
}
