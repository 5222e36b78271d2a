/// Dormand-Prince 5(4) solver for systems of ODEs of any order
///  ```
///  use RustedODE::numerical::DormandPrince::DP_main::DPsolver;
///  use std::collections::HashMap;
///  // damped oscillator y'' = -0.1*y' - y is reduced to y' = y_1, y_1' = -0.1*y_1 - y
///  let solver = DPsolver::new();
///  solver.set_equations(&["y'' = -0.1*y_1 - y"]).unwrap();
///  solver
///      .set_initial_conditions(HashMap::from([("y".to_string(), 1.0), ("y_1".to_string(), 0.0)]))
///      .unwrap();
///  solver.set_range("t", 0.0, 10.0, 0.01).unwrap();
///  let points = solver.run(true).unwrap();
///  println!("y(10) = {:?}", points.last().unwrap().get("y"));
///  ```
/// or the same problem as a task document
///  ```
///  use RustedODE::numerical::DormandPrince::DP_main::DPsolver;
///  use RustedODE::numerical::DormandPrince::DP_task::DPTask;
///  use std::str::FromStr;
///  let task = DPTask::from_str("equations\n eq: y'' = -0.1*y_1 - y\ninitial_conditions\n y: 1.0\n y_1: 0.0\nrange\n arg: t\n start: 0\n end: 10\n initial_step: 0.01\n").unwrap();
///  let points = task.solve(&DPsolver::new()).unwrap();
///  assert_eq!(points.last().unwrap().x(), 10.0);
///  ```
pub mod DormandPrince;
