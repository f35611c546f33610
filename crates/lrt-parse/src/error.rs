use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed xml attribute: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] lrt_fetch::FetchError),

    #[error("missing expected element: {0}")]
    MissingElement(&'static str),

    #[error("non-utf8 content: {0}")]
    Encoding(String),
}

pub type ParseResult<T> = Result<T, ParseError>;
