//! Netlist text through to simulation results.

use approx::assert_abs_diff_eq;
use netlist_core::{
    dsl, Circuit, DeviceRegistry, NetlistError, Simulator, SimulatorConfig, SolverParams, Time,
};

fn build(text: &str) -> netlist_core::Result<Simulator> {
    let ast = dsl::parse(text)?;
    let mut solver = SolverParams::default();
    for setting in &ast.solver {
        solver.apply(&setting.key, setting.value)?;
    }
    let circuit = Circuit::from_ast(&ast, DeviceRegistry::with_defaults())?;
    Simulator::new(circuit, SimulatorConfig::new().with_solver(solver))
}

const INVERTER: &str = "
# single inverter
LOGIC_INPUT A
TTL_7404_INVERT U1 A.Q
.probe U1.Q
";

#[test]
fn test_probe_reports_inverter_output() {
    let mut sim = build(INVERTER).unwrap();
    sim.run_until(Time::from_usec(1));
    let settle = sim.take_observations();
    // the reset value, then the output rising 22 ns in
    assert_eq!(settle.len(), 2);
    assert_eq!(settle[0].probe, "U1.Q");
    assert_eq!(settle[0].value, 0.0);
    assert_eq!(settle[1].time, Time::from_nsec(22));
    assert_eq!(settle[1].value, 1.0);

    sim.set_logic_input("A", true).unwrap();
    sim.run_until(Time::from_usec(2));
    let obs = sim.take_observations();
    assert_eq!(obs.len(), 1);
    assert_eq!(obs[0].value, 0.0);
    // 1 ns input delay plus 15 ns falling delay
    assert_eq!(obs[0].time, Time::from_usec(1) + Time::from_nsec(16));
}

#[test]
fn test_values_params_and_aliases() {
    let text = "
ANALOG_INPUT VIN 10
RES R1 1k
RES R2 R=1k
.alias OUT R1.2
.connect VIN.Q R1.1
.connect OUT R2.1
.connect R2.2 GND
.param R2.R 3k   ; overrides the key=value on the device line
";
    let mut sim = build(text).unwrap();
    sim.run_until(Time::from_usec(1));
    assert_abs_diff_eq!(sim.voltage("OUT").unwrap(), 7.5, epsilon = 1e-6);
}

#[test]
fn test_multi_pin_connect_and_ground_alias() {
    let text = "
ANALOG_INPUT VIN 6
RES R1 1k
RES R2 1k
RES R3 1k
.connect VIN.Q R1.1
.connect R1.2 R2.1 R3.1
.connect R2.2 R3.2 0
";
    let mut sim = build(text).unwrap();
    sim.run_until(Time::from_usec(1));
    // 1k into two 1k in parallel
    assert_abs_diff_eq!(sim.voltage("R2.1").unwrap(), 2.0, epsilon = 1e-6);
}

#[test]
fn test_diode_model_card() {
    let with_model = "
ANALOG_INPUT VIN 5
RES R1 1k
DIODE D1 R1.2 GND MODEL=D1N4148
.model D1N4148 D (IS=2.52n N=1.752)
.connect VIN.Q R1.1
";
    let explicit = "
ANALOG_INPUT VIN 5
RES R1 1k
DIODE D1 R1.2 GND IS=2.52n N=1.752
.connect VIN.Q R1.1
";
    let mut a = build(with_model).unwrap();
    let mut b = build(explicit).unwrap();
    a.run_until(Time::from_usec(10));
    b.run_until(Time::from_usec(10));
    let va = a.voltage("D1.A").unwrap();
    assert!(va > 0.4 && va < 1.0, "diode at {} V", va);
    assert_abs_diff_eq!(va, b.voltage("D1.A").unwrap(), epsilon = 1e-9);
}

#[test]
fn test_undefined_model() {
    let text = "DIODE D1 MODEL=NOPE\n";
    assert!(matches!(
        build(text),
        Err(NetlistError::UndefinedModel { .. })
    ));
}

#[test]
fn test_unknown_class() {
    let err = build("TTL_9999 U1\n").unwrap_err();
    assert!(matches!(err, NetlistError::UnknownDeviceClass { ref class } if class == "TTL_9999"));
}

#[test]
fn test_unknown_pin() {
    let err = build("LOGIC_INPUT A\n.probe A.X\n").unwrap_err();
    assert!(matches!(err, NetlistError::PinNotFound { .. }));
}

#[test]
fn test_duplicate_device() {
    let err = build("RES R1\nCAP R1\n").unwrap_err();
    assert!(matches!(err, NetlistError::DuplicateDevice { .. }));
}

#[test]
fn test_param_for_unknown_device() {
    let err = build("RES R1\n.param R9.R 1k\n").unwrap_err();
    assert!(matches!(err, NetlistError::ParseError { line: 2, .. }));
}

#[test]
fn test_parse_error_reports_line() {
    let err = build("RES R1 1k\n\n.connect R1.1\n").unwrap_err();
    assert!(matches!(err, NetlistError::ParseError { line: 3, .. }));
}

#[test]
fn test_too_many_positional_values() {
    let err = build("RES R1 1k 2k\n").unwrap_err();
    assert!(matches!(err, NetlistError::ParseError { line: 1, .. }));
}

#[test]
fn test_solver_directive() {
    let text = "
.solver freq=96k dynamic_ts=on gs_loops=50
ANALOG_INPUT VIN 1
RES R1 1k
CAP C1 1u
.connect VIN.Q R1.1
.connect R1.2 C1.1
.connect C1.2 GND
";
    let sim = build(text).unwrap();
    let params = sim.config().solver.clone();
    assert_eq!(params.freq, 96e3);
    assert!(params.dynamic_ts);
    assert_eq!(params.gs_loops, 50);
    assert_abs_diff_eq!(params.max_timestep, 1.0 / 96e3, epsilon = 1e-15);

    let err = build(".solver gs_loops=0\n").unwrap_err();
    assert!(matches!(err, NetlistError::InvalidParameter { .. }));
}

#[test]
fn test_stimulus_directives_parse_in_order() {
    let ast = dsl::parse("LOGIC_INPUT A\n.stimulus A 2us 1\n.stimulus A 1us 0\n").unwrap();
    assert_eq!(ast.stimuli.len(), 2);
    assert_eq!(ast.stimuli[0].device, "A");
    assert_eq!(ast.stimuli[0].time, Time::from_usec(2));
    assert_eq!(ast.stimuli[1].value, 0.0);
}

#[test]
fn test_clock_counter_netlist() {
    let text = "
CLOCK CLK 1M
TTL_7490 U1
.connect CLK.Q U1.A
.connect U1.QA U1.B
.probe U1.QD
";
    let mut sim = build(text).unwrap();
    sim.take_observations();
    // one full decade takes ten clock periods
    sim.run_until(Time::from_usec(20));
    let obs = sim.take_observations();
    assert!(!obs.is_empty());
    assert!(obs.iter().all(|o| o.probe == "U1.QD"));
}
