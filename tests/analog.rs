//! Analog groups: transient accuracy, solver agreement and domain proxies.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use netlist_core::devices::Params;
use netlist_core::{Circuit, Simulator, SimulatorConfig, SolverParams, Time};

fn ms(v: i64) -> Time {
    Time::from_msec(v)
}

fn us(v: i64) -> Time {
    Time::from_usec(v)
}

fn simulate(c: Circuit, solver: SolverParams) -> Simulator {
    Simulator::new(c, SimulatorConfig::new().with_solver(solver)).unwrap()
}

/// `VIN -- R1 (1k) -- OUT -- C1 (1u) -- GND`, input at 0 V.
fn rc_circuit() -> Circuit {
    let mut c = Circuit::new();
    c.add_device("ANALOG_INPUT", "VIN", &Params::new()).unwrap();
    c.add_device("RES", "R1", &Params::new().with("R", 1e3)).unwrap();
    c.add_device("CAP", "C1", &Params::new().with("C", 1e-6)).unwrap();
    c.connect("VIN.Q", "R1.1").unwrap();
    c.connect("R1.2", "C1.1").unwrap();
    c.connect("C1.2", "GND").unwrap();
    c.alias("OUT", "R1.2").unwrap();
    c
}

fn rc_step_response(solver: SolverParams) {
    let mut sim = simulate(rc_circuit(), solver);
    sim.set_analog_input("VIN", 1.0).unwrap();
    for t in [1, 2, 5] {
        sim.run_until(ms(t));
        let expected = 1.0 - (-(t as f64) * 1e-3 / 1e-3).exp();
        assert_abs_diff_eq!(sim.voltage("OUT").unwrap(), expected, epsilon = 0.01);
    }
}

#[test]
fn test_rc_step_static_timestep() {
    rc_step_response(SolverParams::default());
}

#[test]
fn test_rc_step_dynamic_timestep() {
    rc_step_response(SolverParams::default().with_dynamic_ts(true));
}

#[test]
fn test_dynamic_timestep_grows_when_settled() {
    let mut sim = simulate(rc_circuit(), SolverParams::default().with_dynamic_ts(true));
    sim.set_analog_input("VIN", 1.0).unwrap();
    sim.run_until(ms(1));
    let early = sim.solver_stats()[0].solves;
    sim.run_until(ms(20));
    let late = sim.solver_stats()[0].solves - early;
    // 19 ms of an almost flat curve need fewer steps per ms than the first
    assert!(late < early * 19, "{} solves early, {} late", early, late);
}

#[test]
fn test_reset_replays_transient() {
    let mut sim = simulate(rc_circuit(), SolverParams::default());
    sim.set_analog_input("VIN", 1.0).unwrap();
    sim.run_until(ms(1));
    let first = sim.voltage("OUT").unwrap();

    // the input keeps its last value across a reset
    sim.set_analog_input("VIN", 0.0).unwrap();
    sim.reset();
    assert_abs_diff_eq!(sim.voltage("OUT").unwrap(), 0.0, epsilon = 1e-9);
    sim.set_analog_input("VIN", 1.0).unwrap();
    sim.run_until(ms(1));
    assert_abs_diff_eq!(sim.voltage("OUT").unwrap(), first, epsilon = 1e-12);
}

/// Nine equal resistors in series from 1 V to ground: eight unknowns.
fn ladder() -> Circuit {
    let mut c = Circuit::new();
    c.add_device("ANALOG_INPUT", "VIN", &Params::new().with("IN", 1.0))
        .unwrap();
    for k in 1..=9 {
        c.add_device("RES", &format!("R{}", k), &Params::new().with("R", 1e3))
            .unwrap();
    }
    c.connect("VIN.Q", "R1.1").unwrap();
    for k in 1..9 {
        c.connect(&format!("R{}.2", k), &format!("R{}.1", k + 1))
            .unwrap();
    }
    c.connect("R9.2", "GND").unwrap();
    c
}

fn ladder_voltages(sim: &Simulator) -> Vec<f64> {
    (1..9)
        .map(|k| sim.voltage(&format!("R{}.2", k)).unwrap())
        .collect()
}

#[test]
fn test_gauss_seidel_matches_divider() {
    let solver = SolverParams::default().with_gs_loops(5000);
    let mut sim = simulate(ladder(), solver);
    sim.run_until(us(1));

    let stats = sim.solver_stats();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].gs_fallbacks, 0);
    assert!(stats[0].gs_iterations > 0);
    for (k, v) in ladder_voltages(&sim).into_iter().enumerate() {
        assert_abs_diff_eq!(v, 1.0 - (k + 1) as f64 / 9.0, epsilon = 1e-5);
    }
}

#[test]
fn test_gauss_seidel_falls_back_to_direct() {
    let mut direct = simulate(ladder(), SolverParams::default().with_gs_threshold(100));
    let mut iterative = simulate(ladder(), SolverParams::default().with_gs_loops(1));
    direct.run_until(us(1));
    iterative.run_until(us(1));

    assert!(iterative.solver_stats()[0].gs_fallbacks > 0);
    assert_eq!(direct.solver_stats()[0].gs_iterations, 0);
    for (a, b) in ladder_voltages(&direct)
        .into_iter()
        .zip(ladder_voltages(&iterative))
    {
        assert_abs_diff_eq!(a, b, epsilon = 1e-9);
    }
}

#[test]
fn test_ladder_current_is_continuous() {
    let mut sim = simulate(
        ladder(),
        SolverParams::default()
            .with_pivot(true)
            .with_gs_threshold(100),
    );
    sim.run_until(us(1));
    let mut v = vec![1.0];
    v.extend(ladder_voltages(&sim));
    v.push(0.0);
    // the same current flows through every resistor
    for pair in v.windows(2) {
        assert_relative_eq!((pair[0] - pair[1]) / 1e3, 1.0 / 9e3, max_relative = 1e-6);
    }
}

#[test]
fn test_diode_operating_point() {
    let mut c = Circuit::new();
    c.add_device("ANALOG_INPUT", "VIN", &Params::new().with("IN", 5.0))
        .unwrap();
    c.add_device("RES", "R1", &Params::new().with("R", 1e3)).unwrap();
    c.add_device("DIODE", "D1", &Params::new()).unwrap();
    c.connect("VIN.Q", "R1.1").unwrap();
    c.connect("R1.2", "D1.A").unwrap();
    c.connect("D1.K", "GND").unwrap();
    let mut sim = simulate(c, SolverParams::default());
    sim.run_until(us(10));

    let vd = sim.voltage("D1.A").unwrap();
    assert!(vd > 0.6 && vd < 0.85, "diode at {} V", vd);
    let i_r = (5.0 - vd) / 1e3;
    let i_d = 1e-15 * ((vd / 0.0258).exp() - 1.0);
    assert_relative_eq!(i_r, i_d, max_relative = 1e-3);
    assert!(sim.solver_stats()[0].newton_iterations > 0);
}

#[test]
fn test_potentiometer_dial() {
    let mut c = Circuit::new();
    c.add_device("ANALOG_INPUT", "VIN", &Params::new().with("IN", 10.0))
        .unwrap();
    let p = Params::new().with("R", 10e3).with("DIAL", 0.25);
    c.add_device("POT", "P1", &p).unwrap();
    c.connect("VIN.Q", "P1.1").unwrap();
    c.connect("P1.2", "GND").unwrap();
    let mut sim = simulate(c, SolverParams::default());
    sim.run_until(us(1));
    assert_abs_diff_eq!(sim.voltage("P1.W").unwrap(), 7.5, epsilon = 1e-6);

    sim.set_param("P1", "DIAL", 0.75).unwrap();
    sim.run_until(us(2));
    assert_abs_diff_eq!(sim.voltage("P1.W").unwrap(), 2.5, epsilon = 1e-6);
}

#[test]
fn test_sources_with_load() {
    let mut c = Circuit::new();
    let vs = Params::new().with("V", 5.0).with("RI", 0.1);
    c.add_device("VS", "V1", &vs).unwrap();
    c.add_device("RES", "R1", &Params::new().with("R", 1e3)).unwrap();
    c.connect("V1.P", "R1.1").unwrap();
    c.connect("V1.N", "GND").unwrap();
    c.connect("R1.2", "GND").unwrap();

    c.add_device("CS", "I1", &Params::new().with("I", 1e-3)).unwrap();
    c.add_device("RES", "R2", &Params::new().with("R", 2e3)).unwrap();
    c.connect("I1.P", "GND").unwrap();
    c.connect("I1.N", "R2.1").unwrap();
    c.connect("R2.2", "GND").unwrap();

    let mut sim = simulate(c, SolverParams::default());
    sim.run_until(us(1));
    assert_abs_diff_eq!(sim.voltage("R1.1").unwrap(), 5.0 * 1e3 / 1000.1, epsilon = 1e-6);
    assert_abs_diff_eq!(sim.voltage("R2.1").unwrap(), 2.0, epsilon = 1e-6);

    sim.set_param("V1", "V", 2.0).unwrap();
    sim.set_param("I1", "I", -0.5e-3).unwrap();
    sim.run_until(us(2));
    assert_abs_diff_eq!(sim.voltage("R1.1").unwrap(), 2.0 * 1e3 / 1000.1, epsilon = 1e-6);
    assert_abs_diff_eq!(sim.voltage("R2.1").unwrap(), -1.0, epsilon = 1e-6);
}

#[test]
fn test_logic_controlled_switch() {
    let mut c = Circuit::new();
    c.add_device("ANALOG_INPUT", "VIN", &Params::new().with("IN", 5.0))
        .unwrap();
    c.add_device("SWITCH", "S1", &Params::new()).unwrap();
    c.add_device("RES", "R1", &Params::new().with("R", 1e3)).unwrap();
    c.add_device("LOGIC_INPUT", "CTL", &Params::new()).unwrap();
    c.connect("VIN.Q", "S1.1").unwrap();
    c.connect("S1.2", "R1.1").unwrap();
    c.connect("R1.2", "GND").unwrap();
    c.connect("CTL.Q", "S1.CTL").unwrap();
    let mut sim = simulate(c, SolverParams::default());
    sim.run_until(us(1));
    assert!(sim.voltage("R1.1").unwrap() < 1e-3);

    sim.set_logic_input("CTL", true).unwrap();
    sim.run_until(us(2));
    assert_abs_diff_eq!(sim.voltage("R1.1").unwrap(), 5.0, epsilon = 1e-3);
}

#[test]
fn test_logic_output_drives_resistor() {
    let mut c = Circuit::new();
    c.add_device("LOGIC_INPUT", "A", &Params::new()).unwrap();
    c.add_device("RES", "R1", &Params::new().with("R", 1e3)).unwrap();
    c.connect("A.Q", "R1.1").unwrap();
    c.connect("R1.2", "GND").unwrap();
    let mut sim = simulate(c, SolverParams::default());
    sim.run_until(us(1));
    // TTL low: 0.1 V behind 1 ohm
    assert_abs_diff_eq!(sim.voltage("R1.1").unwrap(), 0.1 * 1e3 / 1001.0, epsilon = 1e-6);

    sim.set_logic_input("A", true).unwrap();
    sim.run_until(us(2));
    // TTL high: 4.0 V behind 130 ohm
    assert_abs_diff_eq!(sim.voltage("R1.1").unwrap(), 4.0 * 1e3 / 1130.0, epsilon = 1e-6);
}

#[test]
fn test_analog_input_drives_gate_with_hysteresis() {
    let mut c = Circuit::new();
    c.add_device("ANALOG_INPUT", "V1", &Params::new().with("IN", 3.0))
        .unwrap();
    c.add_device("TTL_7404_INVERT", "U1", &Params::new()).unwrap();
    c.connect("V1.Q", "U1.A").unwrap();
    let mut sim = simulate(c, SolverParams::default());
    sim.run_until(us(1));
    assert!(!sim.logic("U1.Q").unwrap());

    // between the thresholds the level holds
    sim.set_analog_input("V1", 1.5).unwrap();
    sim.run_until(us(2));
    assert!(!sim.logic("U1.Q").unwrap());

    sim.set_analog_input("V1", 0.5).unwrap();
    sim.run_until(us(3));
    assert!(sim.logic("U1.Q").unwrap());

    sim.set_analog_input("V1", 1.5).unwrap();
    sim.run_until(us(4));
    assert!(sim.logic("U1.Q").unwrap());
}

#[test]
fn test_parallel_solves_match_serial() {
    fn two_rc() -> Circuit {
        let mut c = rc_circuit();
        c.add_device("RES", "R2", &Params::new().with("R", 2e3)).unwrap();
        c.add_device("CAP", "C2", &Params::new().with("C", 1e-6)).unwrap();
        c.connect("VIN.Q", "R2.1").unwrap();
        c.connect("R2.2", "C2.1").unwrap();
        c.connect("C2.2", "GND").unwrap();
        c
    }

    let mut serial = simulate(two_rc(), SolverParams::default());
    let mut parallel = simulate(two_rc(), SolverParams::default().with_parallel(true));
    assert_eq!(parallel.solver().groups().len(), 2);
    for sim in [&mut serial, &mut parallel] {
        sim.set_analog_input("VIN", 1.0).unwrap();
        sim.run_until(ms(2));
    }
    for pin in ["R1.2", "R2.2"] {
        assert_abs_diff_eq!(
            serial.voltage(pin).unwrap(),
            parallel.voltage(pin).unwrap(),
            epsilon = 1e-12
        );
    }
    // 2 ms with a 2 ms time constant
    assert_abs_diff_eq!(
        serial.voltage("R2.2").unwrap(),
        1.0 - (-1.0f64).exp(),
        epsilon = 0.01
    );
}

#[test]
fn test_probe_records_solved_net() {
    let mut c = rc_circuit();
    c.add_probe("OUT").unwrap();
    let mut sim = simulate(c, SolverParams::default());
    sim.take_observations();
    sim.set_analog_input("VIN", 1.0).unwrap();
    sim.run_until(ms(1));
    let obs = sim.take_observations();
    assert!(obs.len() > 10);
    assert!(obs.windows(2).all(|w| w[0].time <= w[1].time));
    assert!(obs.iter().all(|o| o.probe == "OUT"));
    let last = obs.last().map(|o| o.value).unwrap_or_default();
    assert_abs_diff_eq!(last, sim.voltage("OUT").unwrap(), epsilon = 1e-6);
}

#[test]
fn test_callback_sees_changes() {
    use std::sync::{Arc, Mutex};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut c = rc_circuit();
    c.add_callback("OUT", move |t, v| sink.lock().unwrap().push((t, v)))
        .unwrap();
    let mut sim = simulate(c, SolverParams::default());
    sim.set_analog_input("VIN", 1.0).unwrap();
    sim.run_until(us(100));
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|&(t, _)| t <= us(100)));
}

/// Common-emitter stage: 5 V supply, RC 1k, RB 1M, RE 100 ohm. The PNP
/// version hangs the emitter from the supply and the rest to ground.
fn bjt_stage(model: &str) -> Simulator {
    let mut c = Circuit::new();
    c.add_device("ANALOG_INPUT", "VCC", &Params::new().with("IN", 5.0))
        .unwrap();
    c.add_device("QBJT_EB", "Q1", &Params::new().with("MODEL", model))
        .unwrap();
    c.add_device("RES", "RC", &Params::new().with("R", 1e3)).unwrap();
    c.add_device("RES", "RB", &Params::new().with("R", 1e6)).unwrap();
    c.add_device("RES", "RE", &Params::new().with("R", 100.0)).unwrap();
    let (supply, ground) = if model == "NPN" {
        ("VCC.Q", "GND")
    } else {
        ("GND", "VCC.Q")
    };
    c.connect(supply, "RC.1").unwrap();
    c.connect(supply, "RB.1").unwrap();
    c.connect("RC.2", "Q1.C").unwrap();
    c.connect("RB.2", "Q1.B").unwrap();
    c.connect("Q1.E", "RE.1").unwrap();
    c.connect("RE.2", ground).unwrap();
    let mut sim = simulate(c, SolverParams::default());
    sim.run_until(us(10));
    sim
}

#[test]
fn test_npn_stage_beta_and_kcl() {
    let sim = bjt_stage("NPN");
    let v = |pin: &str| sim.voltage(pin).unwrap();
    let ic = (5.0 - v("Q1.C")) / 1e3;
    let ib = (5.0 - v("Q1.B")) / 1e6;
    let ie = v("Q1.E") / 100.0;
    assert!(ic > 1e-4, "collector current {}", ic);
    assert_relative_eq!(ic / ib, 100.0, max_relative = 1e-3);
    assert_relative_eq!(ic + ib, ie, max_relative = 1e-4);
    assert!(sim.solver_stats()[0].newton_iterations > 0);
}

#[test]
fn test_pnp_stage_beta_and_kcl() {
    let sim = bjt_stage("PNP");
    let v = |pin: &str| sim.voltage(pin).unwrap();
    let ic = v("Q1.C") / 1e3;
    let ib = v("Q1.B") / 1e6;
    let ie = (5.0 - v("Q1.E")) / 100.0;
    assert!(ic > 1e-4, "collector current {}", ic);
    assert_relative_eq!(ic / ib, 100.0, max_relative = 1e-3);
    assert_relative_eq!(ic + ib, ie, max_relative = 1e-4);
    assert!(sim.solver_stats()[0].newton_iterations > 0);
}
