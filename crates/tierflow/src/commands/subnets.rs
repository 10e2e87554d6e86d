use colored::Colorize;
use tierflow_aws::network::{Ipv6Block, ipv6_plan, subdivision_index, subnet_table};

pub fn handle(ipv6: Option<&str>) -> anyhow::Result<()> {
    let plan = match ipv6 {
        Some(block) => {
            let allocation: Ipv6Block = block.parse()?;
            Some(ipv6_plan(&allocation)?)
        }
        None => None,
    };

    println!("{}", "サブネット:".bold());
    for (i, descriptor) in subnet_table().iter().enumerate() {
        let ipv6 = match &plan {
            Some(plan) => plan[i].1.to_string(),
            None => format!("#{}", subdivision_index(descriptor.key)),
        };
        let public = if descriptor.is_public() {
            "public".green()
        } else {
            "private".dimmed()
        };
        println!(
            "  {:<18} {:<14} {:<26} {}",
            descriptor.logical_name().cyan(),
            descriptor.cidr,
            ipv6,
            public
        );
    }
    Ok(())
}
