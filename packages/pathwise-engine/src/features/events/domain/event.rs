//! Events: paths promoted to reportable units
//!
//! An Event pairs one CallPath with its derived feasibility predicate and
//! the dependencies still standing in it. A SupportingEvent additionally
//! carries the predicate over the value it produces for the dependence it
//! resolves.

use crate::features::constraint::domain::{Pred, Variable};
use crate::shared::models::MethodRef;
use crate::shared::ports::ProgramModel;

use super::call_path::CallPath;

/// Entry-point kind of an event's path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    None,
    Activity,
    Service,
    Receiver,
    Ui,
}

impl EntryKind {
    /// Classifies a path by its entry method: `onClick` handlers first,
    /// then the component base class
    pub fn classify(entry: &MethodRef, program: &dyn ProgramModel) -> EntryKind {
        if entry.name == "onClick" {
            return EntryKind::Ui;
        }
        if program.is_subclass_of(&entry.class, "android.app.Activity") {
            return EntryKind::Activity;
        }
        if program.is_subclass_of(&entry.class, "android.app.Service") {
            return EntryKind::Service;
        }
        if program.is_subclass_of(&entry.class, "android.content.BroadcastReceiver") {
            return EntryKind::Receiver;
        }
        if program.is_subclass_of(&entry.class, "android.view.View") {
            return EntryKind::Ui;
        }
        EntryKind::None
    }

    /// Tag written into reports; receiver chains surface under the vector
    /// that injects them
    pub fn tag(self) -> &'static str {
        match self {
            EntryKind::Activity => "activity",
            EntryKind::Service => "service",
            EntryKind::Receiver => "sms",
            EntryKind::Ui => "ui",
            EntryKind::None => "",
        }
    }
}

/// A target path with its feasibility predicate and open dependencies
#[derive(Debug, Clone)]
pub struct Event {
    path: CallPath,
    kind: EntryKind,
    constraint: Option<Pred>,
    dependencies: Vec<Variable>,
}

impl Event {
    pub fn new(path: CallPath, kind: EntryKind, constraint: Option<Pred>) -> Self {
        Event {
            path,
            kind,
            constraint,
            dependencies: Vec::new(),
        }
    }

    pub fn path(&self) -> &CallPath {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn constraint(&self) -> Option<&Pred> {
        self.constraint.as_ref()
    }

    /// Replaces the predicate after a resolution folded new knowledge in
    pub fn update_constraint(&mut self, constraint: Option<Pred>) {
        self.constraint = constraint;
    }

    pub fn dependencies(&self) -> &[Variable] {
        &self.dependencies
    }

    pub fn add_dependence(&mut self, dependence: Variable) {
        if !self.dependencies.contains(&dependence) {
            self.dependencies.push(dependence);
        }
    }

    pub fn add_dependencies(&mut self, dependencies: impl IntoIterator<Item = Variable>) {
        for dependence in dependencies {
            self.add_dependence(dependence);
        }
    }
}

/// An Event that produces a value for another event's dependence
#[derive(Debug, Clone)]
pub struct SupportingEvent {
    event: Event,
    dependence_constraint: Option<Pred>,
}

impl SupportingEvent {
    pub fn new(event: Event, dependence_constraint: Option<Pred>) -> Self {
        SupportingEvent {
            event,
            dependence_constraint,
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Mutable access for resolving the supporting path's own dependencies
    pub fn event_mut(&mut self) -> &mut Event {
        &mut self.event
    }

    /// Predicate over the value this event stores for its dependence
    pub fn dependence_constraint(&self) -> Option<&Pred> {
        self.dependence_constraint.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{MethodBody, ValueType};
    use std::sync::Arc;

    struct Hierarchy;

    impl ProgramModel for Hierarchy {
        fn body(&self, _method: &MethodRef) -> Option<Arc<MethodBody>> {
            None
        }

        fn is_app_method(&self, _method: &MethodRef) -> bool {
            true
        }

        fn is_subclass_of(&self, class: &str, base: &str) -> bool {
            class == "com.app.MainActivity" && base == "android.app.Activity"
                || class == "com.app.SmsListener" && base == "android.content.BroadcastReceiver"
        }
    }

    fn entry(class: &str, name: &str) -> MethodRef {
        MethodRef::new(class, name, Vec::new(), ValueType::Void)
    }

    #[test]
    fn click_handlers_classify_as_ui_before_any_hierarchy_check() {
        let kind = EntryKind::classify(&entry("com.app.Anywhere", "onClick"), &Hierarchy);
        assert_eq!(kind, EntryKind::Ui);
        assert_eq!(kind.tag(), "ui");
    }

    #[test]
    fn component_classes_classify_by_their_base() {
        let activity = EntryKind::classify(&entry("com.app.MainActivity", "onCreate"), &Hierarchy);
        assert_eq!(activity, EntryKind::Activity);

        let receiver = EntryKind::classify(&entry("com.app.SmsListener", "onReceive"), &Hierarchy);
        assert_eq!(receiver, EntryKind::Receiver);
        assert_eq!(receiver.tag(), "sms");

        let plain = EntryKind::classify(&entry("com.app.Helper", "run"), &Hierarchy);
        assert_eq!(plain, EntryKind::None);
        assert_eq!(plain.tag(), "");
    }

    #[test]
    fn dependencies_deduplicate_on_add() {
        let path = CallPath::single(entry("com.app.Main", "run"), 0);
        let mut event = Event::new(path, EntryKind::None, None);

        let dep = Variable::int(1);
        event.add_dependence(dep.clone());
        event.add_dependencies(vec![dep.clone(), Variable::int(2)]);

        assert_eq!(event.dependencies().len(), 2);
    }
}
