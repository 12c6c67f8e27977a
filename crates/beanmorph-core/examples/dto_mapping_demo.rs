//! Domain-to-DTO mapping demonstration
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use beanmorph_core::{
    bean, Bean, Constraint, FieldMapping, FieldTransformer, ParamInfo, Transformer, TypeInfo, TypeRef,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dept {
    pub code: String,
    pub title: String,
}
bean!(mutable Dept { code: String, title: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub salary: u32,
    pub dept: Dept,
}
bean!(mutable Employee { id: i64, name: String, salary: u32, dept: Dept });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeDto {
    pub id: i64,
    pub full_name: String,
    pub dept_code: String,
    pub salary_band: String,
}
bean!(mutable EmployeeDto { id: i64, full_name: String, dept_code: String, salary_band: String });

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeCard {
    pub id: i64,
    pub name: String,
}

impl Bean for EmployeeCard {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<EmployeeCard>("EmployeeCard")
            .constructor(
                vec![ParamInfo::named::<i64>("id"), ParamInfo::named::<String>("name")],
                |args| {
                    Ok(EmployeeCard {
                        id: args.next()?,
                        name: args.next()?,
                    })
                },
            )
            .read_only("id", |c| &c.id)
            .read_only("name", |c| &c.name)
            .constraint("name", Constraint::size(Some(1), Some(8)))
            .build()
    }

    fn type_ref(&self) -> TypeRef {
        TypeRef::of::<EmployeeCard>()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Beanmorph DTO Mapping Demo ===\n");

    let employee = Employee {
        id: 1,
        name: "Ann Example".to_string(),
        salary: 72_000,
        dept: Dept {
            code: "X1".to_string(),
            title: "Research".to_string(),
        },
    };

    demo_mapping(&employee)?;
    println!();
    demo_validation(&employee)?;

    Ok(())
}

fn demo_mapping(employee: &Employee) -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Mappings, flat matching and transformers ---");

    let mut transformer = Transformer::new();
    transformer
        .with_field_mapping([
            FieldMapping::new("name", "full_name"),
            FieldMapping::new("code", "dept_code"),
        ])
        .with_field_transformer([FieldTransformer::from_field("salary_band", "salary", |salary: u32| {
            let band = if salary >= 50_000 { "senior" } else { "junior" };
            band.to_string()
        })])
        .set_flat_field_name_transformation(true);

    let dto: EmployeeDto = transformer.transform(employee)?;
    println!("   {:?}", dto);

    println!("   Settings: {}", transformer.settings().to_json()?);
    Ok(())
}

fn demo_validation(employee: &Employee) -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Validation of an immutable destination ---");

    let mut transformer = Transformer::new();
    transformer.set_validation_enabled(true);

    match transformer.transform::<_, EmployeeCard>(employee) {
        Ok(card) => println!("   Valid: {:?}", card),
        Err(e) => println!("   Rejected: {}", e),
    }

    let short = Employee {
        name: "Ann".to_string(),
        ..employee.clone()
    };
    let card: EmployeeCard = transformer.transform(&short)?;
    println!("   Valid: {:?}", card);
    Ok(())
}
