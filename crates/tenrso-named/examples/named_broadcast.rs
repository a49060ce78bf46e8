//! Named broadcasting walkthrough.
//!
//! This example demonstrates:
//! - Building named tensors with coordinates
//! - Vanilla versus unilateral broadcasting
//! - Arithmetic, reductions and `where_` on named axes
//! - Folding several operands into a template
//!
//! Run with:
//! ```bash
//! RUST_LOG=tenrso_named=debug cargo run --example named_broadcast --features subscriber
//! ```

use tenrso_named::reduce::{coord_max, mean};
use tenrso_named::tracing_support::{init_tracing, TracingConfig};
use tenrso_named::types::selectors;
use tenrso_named::{
    softmax, where_, BroadcastPolicy, Broadcaster, CompareOp, Coord, DenseND, NamedTensor, Result, Template,
};

fn main() -> Result<()> {
    init_tracing(TracingConfig::default())?;
    println!("=== TenRSo Named: Broadcasting Examples ===\n");

    example_image_label()?;
    example_arithmetic()?;
    example_template()?;

    println!("\n=== All examples completed successfully! ===");
    Ok(())
}

fn example_image_label() -> Result<()> {
    println!("--- Example 1: Image and label ---");

    let image = NamedTensor::with_dims(DenseND::<f64>::ones(&[2, 3, 4, 5]), [None, Some("C"), Some("H"), Some("W")])?;
    let label = NamedTensor::with_dims(DenseND::<f64>::zeros(&[2, 4, 5]), [None, Some("H"), Some("W")])?;

    match Broadcaster::vanilla().broadcast(&image, &label) {
        Ok(_) => println!("vanilla: aligned"),
        Err(err) => println!("vanilla: {}", err),
    }

    let b = Broadcaster::unilateral().broadcast(&image, &label)?;
    println!("unilateral: label laid out as {:?}, result {:?}", b.y.shape(), b.shape().unwrap_or_default());
    Ok(())
}

fn example_arithmetic() -> Result<()> {
    println!("\n--- Example 2: Arithmetic and reductions ---");

    let signal = NamedTensor::with_dims(
        DenseND::from_vec(vec![0.2, 0.9, 0.4, 0.1, 0.3, 0.8, 0.6, 0.2], &[2, 4])?,
        [Some("N"), Some("F")],
    )?
    .with_coords(vec![None, Some(Coord::from(vec![50.0, 60.0, 70.0, 80.0]))])?;

    let scaled = (&signal * 10.0)?;
    println!("{}", scaled);

    let peak = coord_max(&signal, "F", false)?;
    println!("peak frequency per row: {:?}", peak.data().iter().collect::<Vec<_>>());

    let avg = mean(&signal, Some(&selectors(["N"])))?;
    println!("mean over N: {:?}", avg.data().iter().collect::<Vec<_>>());

    let probs = softmax(&scaled, "F")?;
    let loud = signal.compare_scalar(CompareOp::Gt, 0.5)?;
    let gated = where_(&loud, &probs, NamedTensor::scalar(0.0))?;
    println!("gated softmax dims: {:?}", gated.dims());
    Ok(())
}

fn example_template() -> Result<()> {
    println!("\n--- Example 3: Template fold ---");

    let template = Template::from_names(["N", "C", "T"])?;
    let series = NamedTensor::with_dims(DenseND::<f64>::zeros(&[100, 8]), [Some("T"), Some("N")])?;
    let weights = NamedTensor::with_dims(DenseND::<f64>::ones(&[3]), [Some("C")])?;

    let (cast, state) = template.fold([&series, &weights])?;
    for (i, x) in cast.iter().enumerate() {
        println!("operand {}: shape {:?}", i, x.shape());
    }
    println!("template result: dims {:?}, shape {:?}", state.dims, state.shape);
    Ok(())
}
