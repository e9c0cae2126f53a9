use planner_solver::{Objective, Sense};

use crate::schema::VariableSchema;

/// Maximize the sum of yearly target fulfillment
pub fn objective(schema: &VariableSchema) -> Objective {
    Objective {
        terms: (0..schema.years())
            .map(|y| (schema.target_fulfillment(y).index(), 1.0))
            .collect(),
        sense: Sense::Maximize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_covers_every_year_once() {
        let schema = VariableSchema::new(4, 3);
        let objective = objective(&schema);

        assert_eq!(objective.sense, Sense::Maximize);
        assert_eq!(objective.terms.len(), 4);
        for (y, &(j, coef)) in objective.terms.iter().enumerate() {
            assert_eq!(j, schema.target_fulfillment(y).index());
            assert_eq!(coef, 1.0);
        }
    }
}
