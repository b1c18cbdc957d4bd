mod inject;
mod loader;
mod model;

pub use inject::{inject_fixture, InjectionReport, PACKAGE_FIELD};
pub use loader::load_collection;
pub use model::{
    Body, BodyMode, Collection, CollectionInfo, Event, FileRef, FileSource, FormParam, Header,
    Item, Request, RequestRef, RequestUrl, Script, ScriptSource, UrlObject, Variable,
};
