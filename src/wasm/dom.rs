//! Page lookups: elements, configuration block and filter selectors.

use tracing::debug;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlOptionElement, HtmlSelectElement};

use crate::catalog::FilterCatalog;
use crate::config::Config;
use crate::error::{Error, FilterKind, Result};
use crate::selection::SelectionSource;

/// Id of the optional `<script type="application/json">` holding a [`Config`].
pub const CONFIG_ELEMENT_ID: &str = "camfilter-config";

pub fn document() -> Result<Document> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| Error::Js("no document".into()))
}

/// Element `id`, cast to `T`.
pub fn element<T: JsCast>(document: &Document, id: &str) -> Result<T> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| Error::MissingElement(id.to_string()))?
        .dyn_into::<T>()
        .map_err(|_| Error::MissingElement(format!("{id} (unexpected element type)")))
}

/// Page configuration, or the defaults when the page carries none.
pub fn load_config(document: &Document) -> Result<Config> {
    match document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|node| node.text_content())
    {
        Some(json) if !json.trim().is_empty() => Config::from_json(&json),
        _ => Ok(Config::default()),
    }
}

/// The two `<select>` elements choosing the filters.
#[derive(Clone)]
pub struct SelectElements {
    composition: HtmlSelectElement,
    color: HtmlSelectElement,
}

impl SelectElements {
    pub fn find(document: &Document, config: &Config) -> Result<Self> {
        Ok(Self {
            composition: element(document, &config.elements.composition)?,
            color: element(document, &config.elements.color)?,
        })
    }

    /// Fill empty selectors from the catalog and select the configured
    /// defaults. Selectors the page already populated are left alone.
    pub fn populate(&self, catalog: &FilterCatalog, config: &Config) -> Result<()> {
        fill(
            &self.composition,
            &catalog.names(FilterKind::Convolution),
            &config.filters.convolution,
        )?;
        fill(&self.color, &catalog.names(FilterKind::Color), &config.filters.color)
    }
}

fn fill(select: &HtmlSelectElement, names: &[&str], selected: &str) -> Result<()> {
    if select.length() > 0 {
        return Ok(());
    }
    for name in names {
        let option = HtmlOptionElement::new_with_text_and_value(name, name)
            .map_err(|err| Error::Js(format!("{err:?}")))?;
        select
            .add_with_html_option_element(&option)
            .map_err(|err| Error::Js(format!("{err:?}")))?;
    }
    select.set_value(selected);
    debug!(id = %select.id(), options = names.len(), "filter selector populated");
    Ok(())
}

impl SelectionSource for SelectElements {
    fn convolution(&self) -> String {
        self.composition.value()
    }

    fn color(&self) -> String {
        self.color.value()
    }
}
