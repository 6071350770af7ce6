//! Project XML documents onto declared contracts.
//!
//! A [`Contract`] names a set of operations, each bound to a path template.
//! A [`Projector`] turns a node into a [`Projection`] of a contract; calling
//! an operation on the projection reads, writes or deletes whatever its path
//! selects, converting text to scalars and matched elements to further
//! projections.
//!
//! # Example
//!
//! ```
//! use xproject::{Contract, ElementType, Operation, Projector, ReturnType, ScalarType};
//!
//! let projector = Projector::builder()
//!     .contract(
//!         Contract::new("Shelf")
//!             .operation(Operation::read("count", "count(/shelf/book)").returns(ScalarType::Int))
//!             .operation(
//!                 Operation::read("books", "/shelf/book")
//!                     .returns(ReturnType::List)
//!                     .element_type(ElementType::contract("Book")),
//!             )
//!             .operation(Operation::write("set_owner", "/shelf/@owner").param("owner")),
//!     )
//!     .contract(Contract::new("Book").operation(Operation::read("title", "@title").returns(ScalarType::String)))
//!     .build()
//!     .unwrap();
//!
//! let shelf = projector
//!     .project_xml_string(r#"<shelf><book title="Dune"/><book title="Emma"/></shelf>"#, "Shelf")
//!     .unwrap();
//! assert_eq!(shelf.get("count").unwrap().as_i64(), Some(2));
//!
//! let books = shelf.get("books").unwrap();
//! let titles: Vec<_> = books
//!     .as_list()
//!     .unwrap()
//!     .iter()
//!     .map(|book| book.as_projection().unwrap().get("title").unwrap().text().unwrap())
//!     .collect();
//! assert_eq!(titles, ["Dune", "Emma"]);
//!
//! shelf.set("set_owner", "ann").unwrap();
//! assert!(shelf.to_xml().unwrap().starts_with(r#"<shelf owner="ann">"#));
//! ```

mod error;
pub use error::{ConfigError, ConversionError, LoadError, ProjectionError, TransformError};

pub mod contract;
pub use contract::{Contract, ContractId, ElementType, Operation, Param, ReturnType, Role};

pub mod convert;
pub use convert::{Conversion, ConverterRegistry, ParseFn, Scalar, ScalarType};

mod value;
pub use value::Value;

mod config;
pub use config::{ProjectorConfig, ProjectorOptions};

mod io;
pub use io::{DocumentLoader, FileDocumentLoader, LoadRequest, Transformer, UrlIo, XmlTransformer};

mod mixin;
pub use mixin::Mixin;

pub mod legality;
pub use legality::{is_legal_setter_path, SetterPath};

mod dispatch;
mod ensure;
mod template;

mod projection;
pub use projection::Projection;

mod projector;
pub use projector::{Projector, ProjectorBuilder};

pub use xproject_dom::{Document, Node, ParseOptions, WriteOptions};
