//! Template parsing for cirrus
//!
//! Raw bytes go through the [`DocumentParser`] (YAML with short-form
//! intrinsic tags resolved by the [`TagRegistry`]) and then the
//! [`ModelBuilder`], which types the tree into a [`Template`].

pub mod builder;
pub mod document;
pub mod emit;
pub mod registry;

use cirrus_core::{Result, Template};

pub use builder::ModelBuilder;
pub use document::{DocumentParser, ParserConfig, DEFAULT_MAX_DEPTH};
pub use registry::{ArityKind, RegistryError, TagConstructor, TagRegistry};

/// Common trait for template front-ends
pub trait Parser {
    type Input: ?Sized;

    fn parse(&self, input: &Self::Input) -> Result<Template>;
}

/// Parse and build in one step.
#[derive(Debug, Default)]
pub struct TemplateParser {
    document: DocumentParser,
    builder: ModelBuilder,
}

impl TemplateParser {
    pub fn new(registry: TagRegistry, config: ParserConfig) -> Self {
        Self {
            document: DocumentParser::new(registry, config),
            builder: ModelBuilder::new(),
        }
    }

    pub fn registry(&self) -> &TagRegistry {
        self.document.registry()
    }
}

impl Parser for TemplateParser {
    type Input = [u8];

    fn parse(&self, input: &[u8]) -> Result<Template> {
        let node = self.document.parse(input)?;
        self.builder.build(&node)
    }
}

/// Parse a template with the default registry and limits.
pub fn parse_template(raw: &[u8]) -> Result<Template> {
    TemplateParser::default().parse(raw)
}
