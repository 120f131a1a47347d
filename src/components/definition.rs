//! Construction of components from netlist module definitions.

use std::collections::{HashMap, HashSet};

use super::*;
use crate::dsl::{ModuleDef, ModuleKind, OptionValue};
use crate::error::{DiscreteError, Result};

/// Typed access to a module's `key=value` options.
///
/// Every key read is remembered so that [`Options::finish`] can reject
/// keys the module kind does not understand.
struct Options<'a> {
    node: &'a str,
    map: &'a HashMap<String, OptionValue>,
    used: HashSet<&'static str>,
}

impl<'a> Options<'a> {
    fn new(def: &'a ModuleDef) -> Self {
        Self {
            node: &def.name,
            map: &def.options,
            used: HashSet::new(),
        }
    }

    fn get(&mut self, key: &'static str) -> Option<&'a OptionValue> {
        self.used.insert(key);
        self.map.get(key)
    }

    fn wrong_type(&self, key: &str, expected: &str, got: &OptionValue) -> DiscreteError {
        DiscreteError::config(
            self.node,
            format!("option '{}' must be a {}, got a {}", key, expected, got.type_name()),
        )
    }

    fn number(&mut self, key: &'static str, default: f64) -> Result<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(OptionValue::Number(v)) => Ok(*v),
            Some(other) => Err(self.wrong_type(key, "number", other)),
        }
    }

    fn flag(&mut self, key: &'static str) -> Result<bool> {
        Ok(self.number(key, 0.0)? != 0.0)
    }

    /// Non-negative integer option.
    fn index(&mut self, key: &'static str, default: u32) -> Result<u32> {
        let v = self.number(key, default as f64)?;
        if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
            return Err(DiscreteError::config(
                self.node,
                format!("option '{}' must be a non-negative integer, got {}", key, v),
            ));
        }
        Ok(v as u32)
    }

    fn list(&mut self, key: &'static str) -> Result<Vec<f64>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(OptionValue::List(values)) => Ok(values.clone()),
            Some(OptionValue::Number(v)) => Ok(vec![*v]),
            Some(other) => Err(self.wrong_type(key, "list", other)),
        }
    }

    fn required_list(&mut self, key: &'static str) -> Result<Vec<f64>> {
        let values = self.list(key)?;
        if values.is_empty() {
            return Err(DiscreteError::config(self.node, format!("option '{}' is required", key)));
        }
        Ok(values)
    }

    fn text(&mut self, key: &'static str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Text(s)) | Some(OptionValue::Ident(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.wrong_type(key, "string", other)),
        }
    }

    fn keyword<T>(&mut self, key: &'static str, default: T, parse: fn(&str) -> Option<T>) -> Result<T> {
        match self.text(key)? {
            None => Ok(default),
            Some(word) => parse(word).ok_or_else(|| {
                DiscreteError::config(self.node, format!("unknown value '{}' for option '{}'", word, key))
            }),
        }
    }

    fn trigger(&mut self, key: &'static str, default: TriggerFunction) -> Result<TriggerFunction> {
        self.keyword(key, default, TriggerFunction::from_keyword)
    }

    fn finish(self) -> Result<()> {
        let mut unknown: Vec<&str> = self
            .map
            .keys()
            .map(String::as_str)
            .filter(|k| !self.used.contains(k))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        Err(DiscreteError::config(
            self.node,
            format!("unknown option(s): {}", unknown.join(", ")),
        ))
    }
}

fn parallel_kind(s: &str) -> Option<ParallelKind> {
    match s.to_uppercase().as_str() {
        "RESISTOR" | "R" => Some(ParallelKind::Resistor),
        "CAPACITOR" | "C" => Some(ParallelKind::Capacitor),
        _ => None,
    }
}

fn shift_right(s: &str) -> Option<bool> {
    match s.to_uppercase().as_str() {
        "LEFT" => Some(false),
        "RIGHT" => Some(true),
        _ => None,
    }
}

fn active_high(s: &str) -> Option<bool> {
    match s.to_uppercase().as_str() {
        "LOW" => Some(false),
        "HIGH" => Some(true),
        _ => None,
    }
}

fn falling_edge(s: &str) -> Option<bool> {
    match s.to_uppercase().as_str() {
        "RISING" => Some(false),
        "FALLING" => Some(true),
        _ => None,
    }
}

impl Component {
    /// Create a component from a netlist module definition.
    ///
    /// Option keys by kind (`[..]` is a list, words are case-insensitive):
    ///
    /// | Kind | Options |
    /// |------|---------|
    /// | `LOOKUP` | `table=[..]` |
    /// | `DIODE_MIX` | `junction=[..]` |
    /// | `INTEGRATOR` | `type=OPAMP\|NORTON_1\|NORTON_2 r1 r2 r3 c v1 vp f0 f1 f2` |
    /// | `OPAMP` | `r1 r2 r3 r4 c vp vn` |
    /// | `OPAMP_ONESHOT` | `r1 .. r5 c1 c2 vp vn` |
    /// | `TVCA` | `r1 .. r11 c1 .. c4 v1 v2 v3 vp f0 .. f5` |
    /// | `DAC_R1` | `r=[..] v_on r_bias v_bias r_gnd c_filter` |
    /// | `COMP_ADDER` | `type=RESISTOR\|CAPACITOR default values=[..]` |
    /// | `MIXER` | `type=RESISTOR\|OP_AMP r=[..] dynamic=[..] c=[..] r_i r_f c_f c_amp v_ref gain` |
    /// | `SHIFT` | `size clock=RISING\|FALLING\|COUNT\|FREQ direction=LEFT\|RIGHT reset=LOW\|HIGH` |
    /// | `BITS_DECODE` | `from to v_out` |
    /// | `XTIME_*` | `invert out_low out_high` |
    /// | `SAMPHOLD` | `mode=RISING\|FALLING\|HIGH\|LOW` |
    /// | `ONESHOT` | `edge=RISING\|FALLING retrigger active_low` |
    /// | `TRANSFORM` | `formula="..."` |
    ///
    /// Trigger function options (`f0` ..) take `TRG0`, `TRG0_INV`, ...,
    /// `TRG12_NAND`. The other kinds take no options.
    pub fn from_def(def: &ModuleDef) -> Result<Self> {
        let mut o = Options::new(def);

        let component = match def.kind {
            ModuleKind::Adder => Component::Adder(Adder),
            ModuleKind::Gain => Component::Gain(Gain),
            ModuleKind::Divide => Component::Divider(Divider::default()),
            ModuleKind::Clamp => Component::Clamp(Clamp),
            ModuleKind::Lookup => Component::Lookup(Lookup::new(o.required_list("table")?)),
            ModuleKind::DiodeMix => Component::DiodeMix(DiodeMix::new(o.list("junction")?)),

            ModuleKind::Integrator => {
                let d = IntegratorConfig::default();
                Component::Integrator(Integrator::new(IntegratorConfig {
                    kind: o.keyword("type", d.kind, IntegratorKind::from_keyword)?,
                    r1: o.number("r1", d.r1)?,
                    r2: o.number("r2", d.r2)?,
                    r3: o.number("r3", d.r3)?,
                    c: o.number("c", d.c)?,
                    v1: o.number("v1", d.v1)?,
                    vp: o.number("vp", d.vp)?,
                    f0: o.trigger("f0", d.f0)?,
                    f1: o.trigger("f1", d.f1)?,
                    f2: o.trigger("f2", d.f2)?,
                }))
            }

            ModuleKind::OpAmp => Component::OpAmp(NortonOpAmp::new(OpAmpConfig {
                r1: o.number("r1", 0.0)?,
                r2: o.number("r2", 0.0)?,
                r3: o.number("r3", 0.0)?,
                r4: o.number("r4", 0.0)?,
                c: o.number("c", 0.0)?,
                vp: o.number("vp", 12.0)?,
                vn: o.number("vn", 0.0)?,
            })),

            ModuleKind::OpAmpOneShot => Component::OpAmpOneShot(OpAmpOneShot::new(OneShotOpAmpConfig {
                r1: o.number("r1", 0.0)?,
                r2: o.number("r2", 0.0)?,
                r3: o.number("r3", 0.0)?,
                r4: o.number("r4", 0.0)?,
                r5: o.number("r5", 0.0)?,
                c1: o.number("c1", 0.0)?,
                c2: o.number("c2", 0.0)?,
                vp: o.number("vp", 12.0)?,
                vn: o.number("vn", 0.0)?,
            })),

            ModuleKind::Tvca => {
                let d = TvcaConfig::default();
                Component::TriggeredVca(TriggeredVca::new(TvcaConfig {
                    r1: o.number("r1", d.r1)?,
                    r2: o.number("r2", d.r2)?,
                    r3: o.number("r3", d.r3)?,
                    r4: o.number("r4", d.r4)?,
                    r5: o.number("r5", d.r5)?,
                    r6: o.number("r6", d.r6)?,
                    r7: o.number("r7", d.r7)?,
                    r8: o.number("r8", d.r8)?,
                    r9: o.number("r9", d.r9)?,
                    r10: o.number("r10", d.r10)?,
                    r11: o.number("r11", d.r11)?,
                    c1: o.number("c1", d.c1)?,
                    c2: o.number("c2", d.c2)?,
                    c3: o.number("c3", d.c3)?,
                    c4: o.number("c4", d.c4)?,
                    v1: o.number("v1", d.v1)?,
                    v2: o.number("v2", d.v2)?,
                    v3: o.number("v3", d.v3)?,
                    vp: o.number("vp", d.vp)?,
                    f0: o.trigger("f0", d.f0)?,
                    f1: o.trigger("f1", d.f1)?,
                    f2: o.trigger("f2", d.f2)?,
                    f3: o.trigger("f3", d.f3)?,
                    f4: o.trigger("f4", d.f4)?,
                    f5: o.trigger("f5", d.f5)?,
                }))
            }

            ModuleKind::DacR1 => {
                let d = DacR1Config::default();
                Component::DacR1(DacR1::new(DacR1Config {
                    r: o.required_list("r")?,
                    v_on: o.number("v_on", d.v_on)?,
                    r_bias: o.number("r_bias", d.r_bias)?,
                    v_bias: o.number("v_bias", d.v_bias)?,
                    r_gnd: o.number("r_gnd", d.r_gnd)?,
                    c_filter: o.number("c_filter", d.c_filter)?,
                }))
            }

            ModuleKind::CompAdder => Component::CompAdder(CompAdder::new(
                o.keyword("type", ParallelKind::Resistor, parallel_kind)?,
                o.number("default", 0.0)?,
                o.required_list("values")?,
            )),

            ModuleKind::Mixer => {
                let d = MixerConfig::default();
                let dynamic = o
                    .list("dynamic")?
                    .into_iter()
                    .map(|ch| {
                        if ch >= 0.0 && ch.fract() == 0.0 {
                            Ok(ch as usize)
                        } else {
                            Err(DiscreteError::config(&def.name, format!("bad dynamic channel {}", ch)))
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Component::Mixer(Mixer::new(MixerConfig {
                    kind: o.keyword("type", d.kind, MixerKind::from_keyword)?,
                    r: o.required_list("r")?,
                    dynamic,
                    c: o.list("c")?,
                    r_i: o.number("r_i", d.r_i)?,
                    r_f: o.number("r_f", d.r_f)?,
                    c_f: o.number("c_f", d.c_f)?,
                    c_amp: o.number("c_amp", d.c_amp)?,
                    v_ref: o.number("v_ref", d.v_ref)?,
                    gain: o.number("gain", d.gain)?,
                }))
            }

            ModuleKind::And => Component::Gate(LogicGate::new(GateOp::And)),
            ModuleKind::Nand => Component::Gate(LogicGate::new(GateOp::Nand)),
            ModuleKind::Or => Component::Gate(LogicGate::new(GateOp::Or)),
            ModuleKind::Nor => Component::Gate(LogicGate::new(GateOp::Nor)),
            ModuleKind::Xor => Component::Gate(LogicGate::new(GateOp::Xor)),
            ModuleKind::Xnor => Component::Gate(LogicGate::new(GateOp::Xnor)),
            ModuleKind::Not => Component::Inverter(LogicInverter),
            ModuleKind::DFlipFlop => Component::DFlipFlop(DFlipFlop::default()),
            ModuleKind::JkFlipFlop => Component::JkFlipFlop(JkFlipFlop::default()),

            ModuleKind::Shift => {
                let d = ShiftConfig::default();
                Component::Shift(ShiftRegister::new(ShiftConfig {
                    size: o.index("size", d.size)?,
                    clock: o.keyword("clock", d.clock, ShiftClock::from_keyword)?,
                    shift_right: o.keyword("direction", d.shift_right, shift_right)?,
                    reset_on_high: o.keyword("reset", d.reset_on_high, active_high)?,
                }))
            }

            ModuleKind::BitsDecode => Component::BitsDecode(BitsDecode::new(
                o.index("from", 0)?,
                o.index("to", 0)?,
                o.number("v_out", 0.0)?,
            )),

            ModuleKind::XTimeBuffer | ModuleKind::XTimeAnd | ModuleKind::XTimeOr | ModuleKind::XTimeXor => {
                let op = match def.kind {
                    ModuleKind::XTimeAnd => XTimeOp::And,
                    ModuleKind::XTimeOr => XTimeOp::Or,
                    ModuleKind::XTimeXor => XTimeOp::Xor,
                    _ => XTimeOp::Buffer,
                };
                Component::XTime(XTimeGate::new(
                    op,
                    o.flag("invert")?,
                    o.number("out_low", 0.0)?,
                    o.number("out_high", 0.0)?,
                ))
            }

            ModuleKind::SampleHold => Component::SampleHold(SampleHold::new(o.keyword(
                "mode",
                SampleHoldMode::RisingEdge,
                SampleHoldMode::from_keyword,
            )?)),
            ModuleKind::Switch => Component::Switch(Switch),
            ModuleKind::AnalogSwitch => Component::AnalogSwitch(AnalogSwitch),
            ModuleKind::Multiplex => Component::Multiplex(Multiplex::default()),

            ModuleKind::OneShot => Component::OneShot(OneShot::new(OneShotMode {
                falling_edge: o.keyword("edge", false, falling_edge)?,
                retrigger: o.flag("retrigger")?,
                active_low: o.flag("active_low")?,
            })),
            ModuleKind::Ramp => Component::Ramp(Ramp::default()),

            ModuleKind::Transform => {
                let formula = o
                    .text("formula")?
                    .ok_or_else(|| DiscreteError::config(&def.name, "option 'formula' is required"))?;
                // Report a bad formula at load time rather than at first reset
                compile(&def.name, formula)?;
                Component::Transform(Transform::new(formula))
            }
        };

        o.finish()?;
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse;

    fn build(line: &str) -> Result<Component> {
        let ast = parse(line)?;
        Component::from_def(&ast.modules[0])
    }

    #[test]
    fn test_kinds_and_options() {
        let mixer = build("MIXER M 1 A B 5k r=[10k, 20k] dynamic=[1] c_f=1u").unwrap();
        assert_eq!(mixer.input_spec(), InputSpec::exact(4));

        let bits = build("BITS_DECODE B X from=2 to=4 v_out=5").unwrap();
        assert_eq!(bits.num_outputs(), 3);

        let xor = build("XTIME_XOR X A B invert=1").unwrap();
        assert_eq!(xor.kind_name(), "XTIME_XOR");

        let tvca = build("TVCA T A r1=10M r2=100k f0=TRG01_NAND").unwrap();
        assert_eq!(tvca.kind_name(), "TVCA");
    }

    #[test]
    fn test_unknown_option_rejected() {
        match build("GAIN G A bogus=1 zz=2") {
            Err(DiscreteError::InvalidConfig { node, message }) => {
                assert_eq!(node, "G");
                assert!(message.contains("bogus, zz"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_option_values() {
        assert!(build("INTEGRATOR I A type=SIDEWAYS").is_err());
        assert!(build("TVCA T A f0=TRG9").is_err());
        assert!(build("SHIFT S 1 1 1 size=2.5").is_err());
        assert!(build("DAC_R1 D A r=\"10k\"").is_err());
        assert!(build("LOOKUP L A").is_err());
        assert!(build("MIXER M 1 A r=[10k] dynamic=[-1]").is_err());
    }

    #[test]
    fn test_transform_formula_checked_at_load() {
        assert!(build("TRANSFORM T A B formula=\"01+\"").is_ok());
        assert!(matches!(
            build("TRANSFORM T A B formula=\"01?\""),
            Err(DiscreteError::InvalidTransformToken { position: 2, .. })
        ));
        assert!(build("TRANSFORM T A B").is_err());
    }
}
