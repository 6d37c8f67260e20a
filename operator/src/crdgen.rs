use kube::CustomResourceExt;

use skeet_operator::target::HttpTarget;

fn main() {
    print!("{}", serde_yaml::to_string(&HttpTarget::crd()).unwrap());
}
