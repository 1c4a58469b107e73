//! Scripted in-memory surface
//!
//! Models the pieces of a dropdown-driven form the engine interacts with:
//! static elements that render after a number of scans, option lists that
//! open when their trigger is clicked and close when an option is picked,
//! and inputs that record the values written to them. Used for dry runs
//! and tests.

use async_trait::async_trait;
use handoff_core_types::{ElementHandle, ElementSnapshot, SurfaceError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ports::SurfacePort;
use crate::types::normalize;

const ELEMENT_PREFIX: &str = "element:";
const OPTION_PREFIX: &str = "option:";

/// Element that exists on the surface from the start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedElement {
    pub selector: String,
    #[serde(default)]
    pub text: String,
    /// Number of scans of `selector` that miss before the element renders
    #[serde(default)]
    pub reveal_after: u32,
}

impl ScriptedElement {
    pub fn new(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
            reveal_after: 0,
        }
    }

    pub fn revealed_after(mut self, scans: u32) -> Self {
        self.reveal_after = scans;
        self
    }
}

/// Option list opened by clicking the element whose text equals `trigger`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedMenu {
    pub trigger: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl ScriptedMenu {
    pub fn new(trigger: impl Into<String>, options: &[&str]) -> Self {
        Self {
            trigger: trigger.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// Declarative description of a surface, loadable from YAML or JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceScript {
    #[serde(default)]
    pub elements: Vec<ScriptedElement>,
    /// Selector under which the currently open option list renders
    #[serde(default = "default_option_selector")]
    pub option_selector: String,
    #[serde(default)]
    pub menus: Vec<ScriptedMenu>,
}

fn default_option_selector() -> String {
    ".ant-select-dropdown-menu-item".to_string()
}

/// Everything the engine did to the surface, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SurfaceAction {
    Click { text: String },
    SetValue { text: String, value: String },
}

#[derive(Debug, Default)]
struct SurfaceState {
    scans: u32,
    polls_by_selector: HashMap<String, u32>,
    open_options: Option<Vec<String>>,
    actions: Vec<SurfaceAction>,
}

pub struct ScriptedSurface {
    script: SurfaceScript,
    state: Mutex<SurfaceState>,
}

impl ScriptedSurface {
    pub fn new(mut script: SurfaceScript) -> Self {
        if script.option_selector.is_empty() {
            script.option_selector = default_option_selector();
        }
        Self {
            script,
            state: Mutex::new(SurfaceState::default()),
        }
    }

    pub fn script(&self) -> &SurfaceScript {
        &self.script
    }

    /// Total number of `query_all` calls served
    pub fn scan_count(&self) -> u32 {
        self.state.lock().scans
    }

    pub fn actions(&self) -> Vec<SurfaceAction> {
        self.state.lock().actions.clone()
    }

    pub fn clicked_texts(&self) -> Vec<String> {
        self.state
            .lock()
            .actions
            .iter()
            .filter_map(|action| match action {
                SurfaceAction::Click { text } => Some(text.clone()),
                SurfaceAction::SetValue { .. } => None,
            })
            .collect()
    }

    fn menu_for(&self, trigger_text: &str) -> Option<&ScriptedMenu> {
        let wanted = normalize(trigger_text);
        self.script
            .menus
            .iter()
            .find(|menu| normalize(&menu.trigger) == wanted)
    }

    fn element_at(&self, handle: &ElementHandle) -> Option<&ScriptedElement> {
        let index: usize = handle.0.strip_prefix(ELEMENT_PREFIX)?.parse().ok()?;
        self.script.elements.get(index)
    }

    fn option_index(handle: &ElementHandle) -> Option<usize> {
        handle.0.strip_prefix(OPTION_PREFIX)?.parse().ok()
    }
}

#[async_trait]
impl SurfacePort for ScriptedSurface {
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, SurfaceError> {
        let mut state = self.state.lock();
        state.scans += 1;
        let polls = {
            let count = state
                .polls_by_selector
                .entry(selector.to_string())
                .or_insert(0);
            *count += 1;
            *count
        };

        let mut found: Vec<ElementSnapshot> = self
            .script
            .elements
            .iter()
            .enumerate()
            .filter(|(_, element)| element.selector == selector && polls > element.reveal_after)
            .map(|(i, element)| ElementSnapshot::new(format!("{ELEMENT_PREFIX}{i}"), &element.text))
            .collect();

        if selector == self.script.option_selector {
            if let Some(options) = &state.open_options {
                found.extend(
                    options
                        .iter()
                        .enumerate()
                        .map(|(i, text)| ElementSnapshot::new(format!("{OPTION_PREFIX}{i}"), text)),
                );
            }
        }

        Ok(found)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();

        if let Some(index) = Self::option_index(element) {
            let text = state
                .open_options
                .as_ref()
                .and_then(|options| options.get(index).cloned())
                .ok_or_else(|| SurfaceError::StaleElement(element.0.clone()))?;
            state.open_options = None;
            state.actions.push(SurfaceAction::Click { text });
            return Ok(());
        }

        let scripted = self
            .element_at(element)
            .ok_or_else(|| SurfaceError::StaleElement(element.0.clone()))?;
        if let Some(menu) = self.menu_for(&scripted.text) {
            state.open_options = Some(menu.options.clone());
        }
        state.actions.push(SurfaceAction::Click {
            text: scripted.text.clone(),
        });
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, value: &str) -> Result<(), SurfaceError> {
        if Self::option_index(element).is_some() {
            return Err(SurfaceError::Unsupported(format!(
                "{} is not an input",
                element.0
            )));
        }
        let scripted = self
            .element_at(element)
            .ok_or_else(|| SurfaceError::StaleElement(element.0.clone()))?;
        self.state.lock().actions.push(SurfaceAction::SetValue {
            text: scripted.text.clone(),
            value: value.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    const OPTIONS: &str = ".ant-select-dropdown-menu-item";

    fn dropdown_surface() -> ScriptedSurface {
        ScriptedSurface::new(SurfaceScript {
            elements: vec![ScriptedElement::new(".placeholder", "Pesquisar...")],
            menus: vec![ScriptedMenu::new("pesquisar...", &["Suporte Externo", "Outros"])],
            ..Default::default()
        })
    }

    #[test]
    fn clicking_trigger_opens_its_menu_and_option_closes_it() {
        let surface = dropdown_surface();
        assert!(block_on(surface.query_all(OPTIONS)).unwrap().is_empty());

        let trigger = block_on(surface.query_all(".placeholder")).unwrap();
        block_on(surface.click(&trigger[0].handle)).unwrap();

        let options = block_on(surface.query_all(OPTIONS)).unwrap();
        let texts: Vec<_> = options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Suporte Externo", "Outros"]);

        block_on(surface.click(&options[0].handle)).unwrap();
        assert!(block_on(surface.query_all(OPTIONS)).unwrap().is_empty());
        assert_eq!(surface.clicked_texts(), vec!["Pesquisar...", "Suporte Externo"]);
    }

    #[test]
    fn clicking_closed_option_is_stale() {
        let surface = dropdown_surface();
        let err = block_on(surface.click(&ElementHandle("option:0".into()))).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn set_value_is_recorded() {
        let surface = ScriptedSurface::new(SurfaceScript {
            elements: vec![ScriptedElement::new(".ant-select-search__field", "")],
            ..Default::default()
        });
        let input = block_on(surface.query_all(".ant-select-search__field")).unwrap();
        block_on(surface.set_value(&input[0].handle, "Sem sinal")).unwrap();
        assert_eq!(
            surface.actions(),
            vec![SurfaceAction::SetValue {
                text: String::new(),
                value: "Sem sinal".into()
            }]
        );
    }

    #[test]
    fn script_loads_from_yaml() {
        let script: SurfaceScript = serde_yaml::from_str(
            r#"
elements:
  - selector: ".icon-label"
    text: Enviar
    reveal_after: 2
menus:
  - trigger: "Selecione um serviço"
    options: ["Instalação"]
"#,
        )
        .unwrap();
        assert_eq!(script.option_selector, OPTIONS);
        assert_eq!(script.elements[0].reveal_after, 2);
        assert_eq!(script.menus[0].options, vec!["Instalação".to_string()]);
    }
}
