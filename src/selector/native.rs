//! Platform-native locator strings: relative XPath alternatives,
//! Android UiAutomator expressions, iOS NSPredicate and class chain
//! expressions. All lists are ordered by specificity, most specific
//! first, and every entry locates at least this element (uniqueness is
//! not guaranteed here, that is what the absolute XPath is for).

use indexmap::IndexMap;

use crate::hierarchy::Platform;
use crate::selector::unique::xpath_escape;

fn attr<'a>(attributes: &'a IndexMap<String, String>, name: &str) -> Option<&'a str> {
    attributes.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

/// Relative (non-unique) XPath alternatives for an element
pub fn relative_xpaths(
    attributes: &IndexMap<String, String>,
    tag: &str,
    platform: Platform,
) -> Vec<String> {
    let mut xpaths = Vec::new();
    match platform {
        Platform::Ios => {
            let name = attr(attributes, "name");
            let label = attr(attributes, "label");
            let value = attr(attributes, "value");
            if let Some(name) = name {
                xpaths.push(format!("//*[@name={}]", xpath_escape(name)));
            }
            if let Some(label) = label {
                xpaths.push(format!("//*[@label={}]", xpath_escape(label)));
            }
            if let Some(value) = value {
                xpaths.push(format!("//*[@value={}]", xpath_escape(value)));
            }
            if let Some(name) = name {
                xpaths.push(format!("//{tag}[@name={}]", xpath_escape(name)));
            }
            xpaths.push(format!("//{tag}"));
        }
        Platform::Android => {
            let resource_id = attr(attributes, "resource-id");
            let content_desc = attr(attributes, "content-desc");
            let text = attr(attributes, "text");
            if let Some(id) = resource_id {
                xpaths.push(format!("//*[@resource-id={}]", xpath_escape(id)));
            }
            if let Some(desc) = content_desc {
                xpaths.push(format!("//*[@content-desc={}]", xpath_escape(desc)));
            }
            if let Some(text) = text {
                xpaths.push(format!("//*[@text={}]", xpath_escape(text)));
            }
            if let Some(text) = text {
                xpaths.push(format!("//{tag}[@text={}]", xpath_escape(text)));
            }
            if let Some(id) = resource_id {
                xpaths.push(format!("//{tag}[@resource-id={}]", xpath_escape(id)));
            }
            xpaths.push(format!("//{tag}"));
        }
    }
    xpaths
}

/// Android UiAutomator selector expressions
pub fn uiautomator(attributes: &IndexMap<String, String>, tag: &str) -> Vec<String> {
    let resource_id = attr(attributes, "resource-id");
    let text = attr(attributes, "text");
    let content_desc = attr(attributes, "content-desc");

    let mut selectors = Vec::new();
    if let Some(id) = resource_id {
        selectors.push(format!("new UiSelector().resourceId(\"{id}\")"));
    }
    if let Some(text) = text {
        selectors.push(format!("new UiSelector().text(\"{text}\")"));
    }
    if let Some(desc) = content_desc {
        selectors.push(format!("new UiSelector().description(\"{desc}\")"));
    }
    if !tag.is_empty() {
        selectors.push(format!("new UiSelector().className(\"{tag}\")"));
        if let Some(text) = text {
            selectors.push(format!(
                "new UiSelector().className(\"{tag}\").text(\"{text}\")"
            ));
        }
        if let Some(id) = resource_id {
            selectors.push(format!(
                "new UiSelector().className(\"{tag}\").resourceId(\"{id}\")"
            ));
        }
    }
    selectors
}

/// iOS NSPredicate expressions
pub fn ios_predicates(attributes: &IndexMap<String, String>, tag: &str) -> Vec<String> {
    let name = attr(attributes, "name");
    let label = attr(attributes, "label");
    let value = attr(attributes, "value");

    let mut predicates = Vec::new();
    if let Some(name) = name {
        predicates.push(format!("name == '{name}'"));
    }
    if let Some(label) = label {
        predicates.push(format!("label == '{label}'"));
    }
    if let Some(value) = value {
        predicates.push(format!("value == '{value}'"));
    }
    if !tag.is_empty() {
        predicates.push(format!("type == '{tag}'"));
        if let Some(label) = label {
            predicates.push(format!("type == '{tag}' AND label == '{label}'"));
        }
    }
    predicates
}

/// iOS class chain expressions
pub fn ios_class_chains(attributes: &IndexMap<String, String>, tag: &str) -> Vec<String> {
    if tag.is_empty() {
        return Vec::new();
    }
    let mut chains = Vec::new();
    if let Some(name) = attr(attributes, "name") {
        chains.push(format!("**/{tag}[`name == '{name}'`]"));
    }
    if let Some(label) = attr(attributes, "label") {
        chains.push(format!("**/{tag}[`label == '{label}'`]"));
    }
    chains.push(format!("**/{tag}"));
    chains
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_android_relative_priority_order() {
        let attributes = attrs(&[
            ("resource-id", "com.app:id/go"),
            ("text", "Go"),
        ]);
        let xpaths = relative_xpaths(&attributes, "android.widget.Button", Platform::Android);
        assert_eq!(
            xpaths,
            vec![
                "//*[@resource-id='com.app:id/go']",
                "//*[@text='Go']",
                "//android.widget.Button[@text='Go']",
                "//android.widget.Button[@resource-id='com.app:id/go']",
                "//android.widget.Button",
            ]
        );
    }

    #[test]
    fn test_ios_relative_includes_value() {
        let attributes = attrs(&[("name", "login"), ("value", "on")]);
        let xpaths = relative_xpaths(&attributes, "XCUIElementTypeSwitch", Platform::Ios);
        assert_eq!(
            xpaths,
            vec![
                "//*[@name='login']",
                "//*[@value='on']",
                "//XCUIElementTypeSwitch[@name='login']",
                "//XCUIElementTypeSwitch",
            ]
        );
    }

    #[test]
    fn test_uiautomator_combinations() {
        let attributes = attrs(&[("resource-id", "com.app:id/go"), ("text", "Go")]);
        let selectors = uiautomator(&attributes, "android.widget.Button");
        assert_eq!(
            selectors,
            vec![
                "new UiSelector().resourceId(\"com.app:id/go\")",
                "new UiSelector().text(\"Go\")",
                "new UiSelector().className(\"android.widget.Button\")",
                "new UiSelector().className(\"android.widget.Button\").text(\"Go\")",
                "new UiSelector().className(\"android.widget.Button\").resourceId(\"com.app:id/go\")",
            ]
        );
    }

    #[test]
    fn test_ios_predicates_and_chains() {
        let attributes = attrs(&[("name", "submit"), ("label", "Submit")]);
        let predicates = ios_predicates(&attributes, "XCUIElementTypeButton");
        assert_eq!(
            predicates,
            vec![
                "name == 'submit'",
                "label == 'Submit'",
                "type == 'XCUIElementTypeButton'",
                "type == 'XCUIElementTypeButton' AND label == 'Submit'",
            ]
        );
        let chains = ios_class_chains(&attributes, "XCUIElementTypeButton");
        assert_eq!(
            chains,
            vec![
                "**/XCUIElementTypeButton[`name == 'submit'`]",
                "**/XCUIElementTypeButton[`label == 'Submit'`]",
                "**/XCUIElementTypeButton",
            ]
        );
    }

    #[test]
    fn test_empty_attributes_skipped() {
        let attributes = attrs(&[("text", "")]);
        let xpaths = relative_xpaths(&attributes, "android.view.View", Platform::Android);
        assert_eq!(xpaths, vec!["//android.view.View"]);
    }
}
