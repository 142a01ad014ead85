use faer::{ColRef, unzip, zip};

use crate::E;

pub(crate) fn inf_norm<'a>(x: ColRef<'a, E>) -> E {
    let mut norm = 0.0;

    zip!(x).for_each(|unzip!(x)| norm = E::max(norm, x.abs()));

    norm
}

pub(crate) fn dot<'a>(x1: ColRef<'a, E>, x2: ColRef<'a, E>) -> E {
    let mut acc = 0.0;

    zip!(x1, x2).for_each(|unzip!(x1, x2)| acc += *x1 * *x2);

    acc
}

#[cfg(test)]
mod tests {
    use faer::Col;

    use super::*;

    #[test]
    fn test_inf_norm() {
        let x_data = [1.0, -4.0, 3.0];
        let x = Col::from_fn(x_data.len(), |i| x_data[i]);
        assert_eq!(inf_norm(x.as_ref()), 4.0);
        assert_eq!(inf_norm(Col::<E>::zeros(0).as_ref()), 0.0);
    }

    #[test]
    fn test_dot() {
        let x1_data = [1.0, 2.0, 3.0];
        let x2_data = [4.0, 5.0, 6.0];
        let x1 = Col::from_fn(x1_data.len(), |i| x1_data[i]);
        let x2 = Col::from_fn(x2_data.len(), |i| x2_data[i]);
        assert_eq!(dot(x1.as_ref(), x2.as_ref()), 32.0);
    }
}
