//! Chain rendering
//!
//! Turns a finished EventChain into the report records and solver script
//! files the output crate persists. Event order in the record follows
//! [`EventChain::events`], so supporting events precede the target. Script
//! files are numbered by that order and referenced from each event record.

use std::collections::BTreeMap;

use pathwise_report::{ChainRecord, EventRecord, ScriptFile};

use crate::errors::Result;
use crate::features::events::domain::{CallPath, Event, EventChain};
use crate::features::solver::ScriptEncoder;
use crate::shared::cancel::CancelToken;
use crate::shared::models::Instruction;
use crate::shared::ports::ProgramModel;

/// Renders chains into persistable records and scripts
pub struct ChainRenderer<'p> {
    program: &'p dyn ProgramModel,
}

impl<'p> ChainRenderer<'p> {
    pub fn new(program: &'p dyn ProgramModel) -> Self {
        ChainRenderer { program }
    }

    pub fn render(
        &self,
        chain: &EventChain,
        token: &CancelToken,
    ) -> Result<(ChainRecord, Vec<ScriptFile>)> {
        let mut events = Vec::with_capacity(chain.len());
        let mut scripts = Vec::new();
        for (index, entry) in chain.events().enumerate() {
            events.push(self.render_event(entry.event(), index, &mut scripts, token)?);
        }

        let record = ChainRecord {
            start: chain.start_method().signature(),
            target: self.target_label(chain),
            events,
        };
        Ok((record, scripts))
    }

    fn render_event(
        &self,
        event: &Event,
        index: usize,
        scripts: &mut Vec<ScriptFile>,
        token: &CancelToken,
    ) -> Result<EventRecord> {
        let path = event.path();
        let mut steps: Vec<String> = path.methods().map(|method| method.signature()).collect();
        steps.push(self.target_text(path));

        let mut record = EventRecord {
            kind: event.kind().tag().to_string(),
            component: path.entry_method().class.clone(),
            path: steps,
            constraint_file: None,
            variables: BTreeMap::new(),
        };

        if let Some(constraint) = event.constraint() {
            let script = ScriptEncoder::new(token.clone()).encode(constraint)?;
            let name = format!("constraints{}.py", index);
            let text = format!(
                "# Start: {}\n# Target: {}\n\n{}",
                path.entry_method().signature(),
                self.target_text(path),
                script.code()
            );
            record.variables = script
                .surfaced_symbols()
                .map(|(var, symbol)| (var.to_string(), symbol.to_string()))
                .collect();
            record.constraint_file = Some(name.clone());
            scripts.push(ScriptFile { name, text });
        }
        Ok(record)
    }

    /// Text of a path's target instruction
    fn target_text(&self, path: &CallPath) -> String {
        self.program
            .body(path.target_method())
            .and_then(|body| {
                body.instruction(path.target_site())
                    .map(Instruction::to_string)
            })
            .unwrap_or_else(|| {
                format!(
                    "instruction {} in {}",
                    path.target_site(),
                    path.target_method().signature()
                )
            })
    }

    /// Signature of the API the chain ultimately invokes
    fn target_label(&self, chain: &EventChain) -> String {
        let path = chain.target().path();
        self.program
            .body(path.target_method())
            .and_then(|body| {
                body.instruction(path.target_site())
                    .and_then(Instruction::call)
                    .map(|call| call.callee.signature())
            })
            .unwrap_or_else(|| self.target_text(path))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::features::constraint::domain::{Expression, Operator, Predicate, Variable};
    use crate::features::events::domain::{EntryKind, SupportingEvent};
    use crate::shared::models::{
        Call, InstrKind, MethodBody, MethodRef, Operand, ValueType,
    };
    use rustc_hash::FxHashMap;

    struct FixtureProgram {
        bodies: FxHashMap<MethodRef, Arc<MethodBody>>,
    }

    impl FixtureProgram {
        fn new() -> Self {
            FixtureProgram {
                bodies: FxHashMap::default(),
            }
        }

        fn with_body(mut self, body: MethodBody) -> Self {
            let method = body.method().as_ref().clone();
            self.bodies.insert(method, Arc::new(body));
            self
        }
    }

    impl ProgramModel for FixtureProgram {
        fn body(&self, method: &MethodRef) -> Option<Arc<MethodBody>> {
            self.bodies.get(method).cloned()
        }

        fn is_app_method(&self, method: &MethodRef) -> bool {
            method.class.starts_with("com.app")
        }
    }

    fn sink_ref() -> MethodRef {
        MethodRef::new_static(
            "android.telephony.SmsManager",
            "sendTextMessage",
            vec![],
            ValueType::Void,
        )
    }

    fn trigger_ref() -> MethodRef {
        MethodRef::new_static("com.app.Main", "trigger", vec![], ValueType::Void)
    }

    fn trigger_body() -> MethodBody {
        let instructions = vec![
            Instruction::new(0, InstrKind::Invoke(Call::statik(sink_ref(), vec![]))),
            Instruction::new(1, InstrKind::ReturnVoid),
        ];
        MethodBody::new(Arc::new(trigger_ref()), instructions, FxHashMap::default()).unwrap()
    }

    fn guarded_event() -> Event {
        let pred = Predicate::expr(
            Expression::combine(
                Operator::Eq,
                Some(Expression::leaf(Variable::input(1, 0xbeef, ValueType::Int))),
                Some(Expression::leaf(Variable::int(4))),
            )
            .unwrap(),
        );
        Event::new(
            CallPath::single(trigger_ref(), 0),
            EntryKind::None,
            Some(pred),
        )
    }

    #[test]
    fn records_carry_path_target_and_script_reference() {
        let program = FixtureProgram::new().with_body(trigger_body());
        let chain = EventChain::new(guarded_event());

        let (record, scripts) = ChainRenderer::new(&program)
            .render(&chain, &CancelToken::unbounded())
            .unwrap();

        assert_eq!(record.target, sink_ref().signature());
        assert_eq!(record.start, trigger_ref().signature());
        assert_eq!(record.events.len(), 1);

        let event = &record.events[0];
        assert_eq!(event.component, "com.app.Main");
        assert_eq!(event.path.len(), 2);
        assert_eq!(event.path[0], trigger_ref().signature());
        assert!(event.path[1].contains("sendTextMessage"));
        assert_eq!(event.constraint_file.as_deref(), Some("constraints0.py"));
        assert_eq!(event.variables.len(), 1);

        assert_eq!(scripts.len(), 1);
        let text = &scripts[0].text;
        assert!(text.starts_with(&format!("# Start: {}\n# Target: ", trigger_ref().signature())));
        assert!(text.contains("s.add((pv0 == 4))"));
    }

    #[test]
    fn scripts_number_by_execution_order() {
        let program = FixtureProgram::new().with_body(trigger_body());
        let mut chain = EventChain::new(guarded_event());
        chain.push_supporting(SupportingEvent::new(guarded_event(), None));

        let (record, scripts) = ChainRenderer::new(&program)
            .render(&chain, &CancelToken::unbounded())
            .unwrap();

        // The supporting event renders first and owns constraints0.py.
        assert_eq!(record.events.len(), 2);
        assert_eq!(
            record.events[0].constraint_file.as_deref(),
            Some("constraints0.py")
        );
        assert_eq!(
            record.events[1].constraint_file.as_deref(),
            Some("constraints1.py")
        );
        assert_eq!(scripts[0].name, "constraints0.py");
        assert_eq!(scripts[1].name, "constraints1.py");
    }

    #[test]
    fn unconstrained_events_reference_no_script() {
        let program = FixtureProgram::new().with_body(trigger_body());
        let chain = EventChain::new(Event::new(
            CallPath::single(trigger_ref(), 0),
            EntryKind::None,
            None,
        ));

        let (record, scripts) = ChainRenderer::new(&program)
            .render(&chain, &CancelToken::unbounded())
            .unwrap();

        assert!(record.events[0].constraint_file.is_none());
        assert!(record.events[0].variables.is_empty());
        assert!(scripts.is_empty());
    }
}
