//! AndroidManifest.xml Parser
//!
//! Only the root `<manifest package="...">` attribute matters for debugging.

use std::path::Path;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::ResolveError;

/// Manifest parser
pub struct ManifestParser;

impl ManifestParser {
    /// Read the package attribute from a manifest file
    pub async fn package_from_file(path: impl AsRef<Path>) -> Result<Option<String>, ResolveError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::package_attribute(&content)
    }

    /// Read the package attribute of the root `<manifest>` element.
    ///
    /// Returns `Ok(None)` when the attribute is absent or empty, which is
    /// normal for projects that declare the namespace in Gradle instead.
    pub fn package_attribute(xml: &str) -> Result<Option<String>, ResolveError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.name().as_ref() != b"manifest" {
                        return Err(ResolveError::InvalidManifest("root element is not <manifest>".into()));
                    }
                    for attr in e.attributes() {
                        let attr = attr.map_err(|err| ResolveError::InvalidManifest(err.to_string()))?;
                        if attr.key.as_ref() == b"package" {
                            let value = attr
                                .unescape_value()
                                .map_err(|err| ResolveError::InvalidManifest(err.to_string()))?;
                            let value = value.trim();
                            return Ok((!value.is_empty()).then(|| value.to_string()));
                        }
                    }
                    return Ok(None);
                }
                Ok(Event::Eof) => return Ok(None),
                Err(err) => return Err(ResolveError::InvalidManifest(err.to_string())),
                _ => {}
            }
        }
    }
}
