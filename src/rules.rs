use crate::tag::TagSet;

/// Matches newly managed windows by substring and assigns defaults to them.
///
/// `None` pattern fields match anything. A zero tag mask and an unset monitor
/// leave those fields alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub class: Option<&'static str>,
    pub instance: Option<&'static str>,
    pub title: Option<&'static str>,
    pub tags: u32,
    pub floating: bool,
    pub terminal: bool,
    pub no_swallow: bool,
    pub monitor: Option<usize>,
}

impl Rule {
    pub const fn new() -> Rule {
        Rule {
            class: None,
            instance: None,
            title: None,
            tags: 0,
            floating: false,
            terminal: false,
            no_swallow: false,
            monitor: None,
        }
    }

    pub const fn class(mut self, class: &'static str) -> Rule {
        self.class = Some(class);
        self
    }

    pub const fn instance(mut self, instance: &'static str) -> Rule {
        self.instance = Some(instance);
        self
    }

    pub const fn title(mut self, title: &'static str) -> Rule {
        self.title = Some(title);
        self
    }

    pub const fn tags(mut self, tags: u32) -> Rule {
        self.tags = tags;
        self
    }

    pub const fn floating(mut self, floating: bool) -> Rule {
        self.floating = floating;
        self
    }

    pub const fn terminal(mut self) -> Rule {
        self.terminal = true;
        self
    }

    pub const fn no_swallow(mut self) -> Rule {
        self.no_swallow = true;
        self
    }

    pub const fn monitor(mut self, monitor: usize) -> Rule {
        self.monitor = Some(monitor);
        self
    }

    pub fn matches(&self, class: &str, instance: &str, title: &str) -> bool {
        let hit = |pat: Option<&str>, s: &str| pat.map_or(true, |p| s.contains(p));
        hit(self.title, title) && hit(self.class, class) && hit(self.instance, instance)
    }
}

/// The combined effect of every matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RuleOutcome {
    pub tags: TagSet,
    pub floating: bool,
    pub terminal: bool,
    pub no_swallow: bool,
    pub monitor: Option<usize>,
}

/// Evaluate `rules` top to bottom; later matches overwrite earlier ones field by field.
pub fn apply_rules(rules: &[Rule], class: &str, instance: &str, title: &str) -> RuleOutcome {
    let mut out = RuleOutcome::default();
    for r in rules.iter().filter(|r| r.matches(class, instance, title)) {
        trace!("rule {:?} matched {}/{}/{}", r, class, instance, title);
        out.floating = r.floating;
        out.terminal = r.terminal;
        out.no_swallow = r.no_swallow;
        if r.tags != 0 {
            out.tags = TagSet::from_bits(r.tags);
        }
        if r.monitor.is_some() {
            out.monitor = r.monitor;
        }
    }
    out
}

/// Final tag mask for a new client: rule tags if any, else what the monitor shows.
pub fn resolve_tags(rule_tags: TagSet, monitor_tags: TagSet, valid: TagSet) -> TagSet {
    let tags = rule_tags & valid;
    if tags.is_empty() {
        monitor_tags
    } else {
        tags
    }
}
