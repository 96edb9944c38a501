use thiserror::Error;

#[derive(Error, Debug)]
pub enum ItsError {
    #[error("document error: {0}")]
    Dom(#[from] itstool_dom::DomError),

    #[error("XPath error evaluating '{selector}': {source}")]
    XPath {
        selector: String,
        #[source]
        source: itstool_xpath::XPathError,
    },

    #[error("rules document error: {0}")]
    RulesDocument(String),

    #[error("rules document is not well-formed XML: {0}")]
    RulesParse(#[from] roxmltree::Error),

    #[error("could not read rules file: {0}")]
    Io(#[from] std::io::Error),
}

/// One rule in a `<rules>` document that was rejected during construction.
/// Per spec §7, a rule-file error is a warning: the offending rule is
/// skipped, not a reason to abort loading the rest of the rule set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleBuildError {
    #[error("<{rule}> is missing required attribute '{attribute}'")]
    MissingAttribute { rule: String, attribute: String },

    #[error("<{rule}> attribute '{attribute}' has unrecognized value '{value}'")]
    InvalidValue {
        rule: String,
        attribute: String,
        value: String,
    },

    #[error("<{0}> is not a recognized ITS rule element")]
    UnknownRuleElement(String),
}
