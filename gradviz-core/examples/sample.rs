//! Records a small branching network and writes its diagram at several
//! collapse depths. Output is DOT source, so no graphviz installation is
//! needed; pass a depth argument to render just that one.

use std::env;

use gradviz_core::{render_network, InputSource, OutputFormat, RenderOptions};
use gradviz_nn::{ops, Activation, Forward, Linear, Module, NnError, Tensor};

#[derive(Debug)]
struct SampleNet {
    linear_1: Linear,
    linear_2: Linear,
    linear_3: Linear,
    my_special_relu: Activation,
}

impl SampleNet {
    fn new() -> Result<SampleNet, NnError> {
        Ok(SampleNet {
            linear_1: Linear::new(3, 3, true)?,
            linear_2: Linear::new(3, 3, true)?,
            linear_3: Linear::new(6, 1, true)?,
            my_special_relu: Activation::relu(),
        })
    }
}

impl Module for SampleNet {
    fn forward(&self, cx: &mut Forward<'_>, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError> {
        let x = cx.call(&self.linear_1, inputs)?;
        let y = cx.call(&self.linear_2, inputs)?;
        let z = ops::cat(&[x[0].clone(), y[0].clone()], 1)?;
        let z = cx.call(&self.linear_3, &[z])?;
        cx.call(&self.my_special_relu, &z)
    }

    fn named_children(&self) -> Vec<(String, &dyn Module)> {
        vec![
            ("linear_1".to_string(), &self.linear_1 as &dyn Module),
            ("linear_2".to_string(), &self.linear_2 as &dyn Module),
            ("linear_3".to_string(), &self.linear_3 as &dyn Module),
            (
                "my_special_relu".to_string(),
                &self.my_special_relu as &dyn Module,
            ),
        ]
    }

    fn type_name(&self) -> &'static str {
        "SampleNet"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let depths: Vec<i32> = match env::args().nth(1) {
        Some(arg) => vec![arg.parse()?],
        None => vec![0, 1, 2],
    };
    for depth in depths {
        let net = SampleNet::new()?;
        let options = RenderOptions::new()
            .depth(depth)
            .format(OutputFormat::Dot)
            .directory("renders");
        let path = render_network(
            &net,
            "SampleNet",
            InputSource::Shape(vec![1, 3]),
            &options,
        )?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
