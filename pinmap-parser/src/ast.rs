// Directive records produced by the parser (or built in code)

use crate::SourceLocation;

/// One statement of a directive file
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `pin "name", to: "file.js", preload: true`
    Pin(PinDirective),
    /// `pin_all_from "dir", under: "prefix", to: "asset/prefix", preload: true`
    PinAll(PinAllDirective),
}

impl Directive {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Directive::Pin(pin) => &pin.location,
            Directive::PinAll(pin_all) => &pin_all.location,
        }
    }
}

/// A single module name bound to one asset
#[derive(Debug, Clone, PartialEq)]
pub struct PinDirective {
    pub name: String,
    pub to: Option<String>,
    pub preload: Option<bool>,
    pub location: SourceLocation,
}

impl PinDirective {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            to: None,
            preload: None,
            location: SourceLocation::unknown(),
        }
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.preload = Some(preload);
        self
    }
}

/// Every module file below a directory, named under a common prefix
#[derive(Debug, Clone, PartialEq)]
pub struct PinAllDirective {
    pub directory: String,
    pub under: Option<String>,
    pub to: Option<String>,
    pub preload: Option<bool>,
    pub location: SourceLocation,
}

impl PinAllDirective {
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            under: None,
            to: None,
            preload: None,
            location: SourceLocation::unknown(),
        }
    }

    pub fn under(mut self, under: impl Into<String>) -> Self {
        self.under = Some(under.into());
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.preload = Some(preload);
        self
    }
}

impl From<PinDirective> for Directive {
    fn from(pin: PinDirective) -> Self {
        Directive::Pin(pin)
    }
}

impl From<PinAllDirective> for Directive {
    fn from(pin_all: PinAllDirective) -> Self {
        Directive::PinAll(pin_all)
    }
}
