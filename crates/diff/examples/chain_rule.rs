//! Reverse-mode autodiff on a scalar expression tree.
//!
//! Run with: cargo run -p treegrad-diff --example chain_rule
//!
//! This example demonstrates:
//! - Building y = a*x + b from composition helpers
//! - Forward evaluation
//! - Backward differentiation with the default seed and a custom one
//! - Gradients through unary operators
//! - Numerical gradient checking

use treegrad_core::expr::{add, cos, exp, literal, multiply, sin};
use treegrad_core::render::tree;
use treegrad_core::{GradConfig, NonFinite};
use treegrad_diff::backward::{differentiate, differentiate_seeded, grad, grad_check};
use treegrad_diff::forward::{evaluate, evaluate_with};

fn main() {
    env_logger::init();

    println!("=== Reverse-Mode Autodiff over Expression Trees ===\n");

    // -------------------------------------------------------------------------
    // 1. y = a*x + b
    // -------------------------------------------------------------------------
    println!("1. Affine: y = a*x + b");
    println!("----------------------");
    println!();

    let y = add(multiply(literal(8.0), literal(3.0)), literal(1.2));
    println!("Expression: {}", y);
    print!("{}", tree(&y));
    println!();

    match evaluate(&y) {
        Ok(value) => println!("Forward:  y = {}", value),
        Err(e) => println!("Forward failed: {}", e),
    }

    let Some(calc) = y.as_calc() else {
        return;
    };
    match differentiate(calc) {
        Ok(grads) => {
            println!("Backward: {}", grads);
            println!("  grad_a = {} (= x)", grads.leaf_grads()[0]);
            println!("  grad_x = {} (= a)", grads.leaf_grads()[1]);
            println!("  grad_b = {}", grads.leaf_grads()[2]);
        }
        Err(e) => println!("Backward failed: {}", e),
    }
    println!();

    // -------------------------------------------------------------------------
    // 2. Seed scaling
    // -------------------------------------------------------------------------
    println!("2. Upstream seed k = 0.5");
    println!("------------------------");
    println!();

    if let Ok(grads) = differentiate_seeded(calc, 0.5) {
        println!("Leaf gradients: {:?}", grads.leaf_grads());
        println!("(every gradient is halved)");
    }
    println!();

    // -------------------------------------------------------------------------
    // 3. Unary operators
    // -------------------------------------------------------------------------
    println!("3. z = e^(sin(x)) * cos(x) at x = 0.3");
    println!("-------------------------------------");
    println!();

    let z = multiply(exp(sin(literal(0.3))), cos(literal(0.3)));
    if let Ok(g) = grad(&z, &GradConfig::default()) {
        print!("{}", tree(&g));
        let total: f64 = g.leaf_grads().iter().sum();
        println!("dz/dx (both uses of x summed) = {:.6}", total);
    }
    println!();

    // -------------------------------------------------------------------------
    // 4. Gradient check
    // -------------------------------------------------------------------------
    println!("4. Numerical gradient check");
    println!("---------------------------");
    println!();

    match grad_check(&z, 1e-6, 1e-5) {
        Ok(()) => println!("Analytical gradients match central differences"),
        Err(e) => println!("{}", e),
    }
    println!();

    // -------------------------------------------------------------------------
    // 5. Domain errors
    // -------------------------------------------------------------------------
    println!("5. Overflow: e^(710)");
    println!("--------------------");
    println!();

    let big = exp(literal(710.0));
    match evaluate(&big) {
        Ok(value) => println!("value = {}", value),
        Err(e) => println!("Rejected: {}", e),
    }
    if let Ok(value) = evaluate_with(&big, NonFinite::Propagate) {
        println!("With NonFinite::Propagate: value = {}", value);
    }
}
