//! Persisted SQL editor tab state

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// State of one SQL editor tab as owned by the tab host.
///
/// Everything below `mode_state` is UI bookkeeping for result, plan and
/// statistics sub-tabs; it is cleared on restore since results never survive
/// a reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlEditorTabState {
    pub editor_id: String,
    /// Display slot ("Script 3"), unique among open SQL tabs
    pub order: u32,
    pub datasource_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tab_id: Option<String>,
    /// Where the editor was opened from (e.g. "navigator")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_mode_id: Option<String>,
    pub mode_state: Vec<Value>,
    pub tabs: Vec<SqlEditorTab>,
    pub execution_plan_tabs: Vec<SqlExecutionPlanTab>,
    pub result_groups: Vec<SqlResultGroup>,
    pub result_tabs: Vec<SqlResultTab>,
    pub statistics_tabs: Vec<SqlStatisticsTab>,
}

impl SqlEditorTabState {
    pub fn new(
        editor_id: impl Into<String>,
        datasource_key: impl Into<String>,
        order: u32,
        source: Option<String>,
    ) -> Self {
        Self {
            editor_id: editor_id.into(),
            order,
            datasource_key: datasource_key.into(),
            current_tab_id: None,
            source,
            current_mode_id: None,
            mode_state: Vec::new(),
            tabs: Vec::new(),
            execution_plan_tabs: Vec::new(),
            result_groups: Vec::new(),
            result_tabs: Vec::new(),
            statistics_tabs: Vec::new(),
        }
    }

    /// Drop every result, plan and statistics sub-tab
    pub fn clear_results(&mut self) {
        self.current_tab_id = Some(String::new());
        self.tabs.clear();
        self.result_groups.clear();
        self.result_tabs.clear();
        self.execution_plan_tabs.clear();
        self.statistics_tabs.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlEditorTab {
    pub id: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlResultGroup {
    pub group_id: String,
    pub query: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlResultTab {
    pub tab_id: String,
    pub group_id: String,
    pub index_in_result_set: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlExecutionPlanTab {
    pub tab_id: String,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlStatisticsTab {
    pub tab_id: String,
    pub order: u32,
}

/// A persisted state field has the wrong shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateShapeError {
    #[error("handler state is not an object")]
    NotAnObject,

    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

#[derive(Clone, Copy)]
enum Shape {
    String,
    Number,
    OptionalString,
    Array,
}

impl Shape {
    fn matches(self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Shape::String, Some(Value::String(_))) => true,
            (Shape::Number, Some(Value::Number(_))) => true,
            (Shape::OptionalString, None | Some(Value::String(_))) => true,
            (Shape::Array, Some(Value::Array(_))) => true,
            _ => false,
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Shape::String => "a string",
            Shape::Number => "a number",
            Shape::OptionalString => "a string or absent",
            Shape::Array => "an array",
        }
    }
}

const STATE_SHAPE: &[(&str, Shape)] = &[
    ("editorId", Shape::String),
    ("datasourceKey", Shape::String),
    ("order", Shape::Number),
    ("currentTabId", Shape::OptionalString),
    ("source", Shape::OptionalString),
    ("currentModeId", Shape::OptionalString),
    ("modeState", Shape::Array),
    ("tabs", Shape::Array),
    ("executionPlanTabs", Shape::Array),
    ("resultGroups", Shape::Array),
    ("resultTabs", Shape::Array),
    ("statisticsTabs", Shape::Array),
];

/// Check every expected field of a persisted handler state, in order.
///
/// Only shapes are checked here; the contents of the sub-tab arrays are
/// never trusted and get discarded on restore.
pub fn validate_persisted_state(state: &Value) -> Result<(), StateShapeError> {
    let object = state.as_object().ok_or(StateShapeError::NotAnObject)?;

    for &(field, shape) in STATE_SHAPE {
        if !shape.matches(object.get(field)) {
            return Err(StateShapeError::InvalidField {
                field,
                expected: shape.expected(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn valid_state() -> Value {
        json!({
            "editorId": "editor-1",
            "order": 1,
            "datasourceKey": "memory",
            "currentTabId": "tab-1",
            "modeState": [],
            "tabs": [{ "id": "tab-1", "order": 0 }],
            "executionPlanTabs": [],
            "resultGroups": [],
            "resultTabs": [],
            "statisticsTabs": []
        })
    }

    #[test]
    fn test_valid_state_passes() {
        assert_eq!(validate_persisted_state(&valid_state()), Ok(()));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert_eq!(
            validate_persisted_state(&json!([1, 2])),
            Err(StateShapeError::NotAnObject)
        );
    }

    #[test]
    fn test_tabs_must_be_an_array() {
        let mut state = valid_state();
        state["tabs"] = json!("nope");

        assert_eq!(
            validate_persisted_state(&state),
            Err(StateShapeError::InvalidField {
                field: "tabs",
                expected: "an array",
            })
        );
    }

    #[test]
    fn test_datasource_key_must_be_a_string() {
        let mut state = valid_state();
        state["datasourceKey"] = json!(5);

        assert!(matches!(
            validate_persisted_state(&state),
            Err(StateShapeError::InvalidField {
                field: "datasourceKey",
                ..
            })
        ));
    }

    #[test]
    fn test_optional_strings_may_be_absent_but_not_null() {
        let mut state = valid_state();
        state.as_object_mut().unwrap().remove("currentTabId");
        assert_eq!(validate_persisted_state(&state), Ok(()));

        state["source"] = Value::Null;
        assert!(validate_persisted_state(&state).is_err());
    }

    #[test]
    fn test_order_must_be_a_number() {
        let mut state = valid_state();
        state["order"] = json!("1");
        assert!(validate_persisted_state(&state).is_err());
    }

    #[test]
    fn test_clear_results_resets_sub_tabs() {
        let mut state = SqlEditorTabState::new("e", "memory", 1, None);
        state.tabs.push(SqlEditorTab {
            id: "t".into(),
            order: 0,
        });
        state.statistics_tabs.push(SqlStatisticsTab {
            tab_id: "s".into(),
            order: 0,
        });

        state.clear_results();

        assert_eq!(state.current_tab_id.as_deref(), Some(""));
        assert!(state.tabs.is_empty());
        assert!(state.statistics_tabs.is_empty());
    }
}
