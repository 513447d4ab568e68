use std::collections::HashMap;

/// Greedy graph coloring of constraints by shared particles.
///
/// Returns color classes of constraint indices; no two constraints in one
/// class touch the same particle, so a class can be projected in parallel and
/// applied at once with Gauss-Seidel semantics. Classes come out in first-fit
/// order. Constraints that find no free color among the first 64 each get a
/// class of their own.
pub fn color_constraints<'a, I>(constraints: I) -> Vec<Vec<u32>>
where
    I: IntoIterator<Item = (u32, &'a [u32])>,
{
    let mut used: HashMap<u32, u64> = HashMap::new();
    let mut classes: Vec<Vec<u32>> = Vec::new();
    let mut overflow = Vec::new();

    for (index, particles) in constraints {
        let taken = particles
            .iter()
            .fold(0u64, |mask, p| mask | used.get(p).copied().unwrap_or(0));
        let color = (!taken).trailing_zeros() as usize;
        if color >= 64 {
            overflow.push(index);
            continue;
        }
        for &p in particles {
            *used.entry(p).or_default() |= 1 << color;
        }
        if classes.len() <= color {
            classes.resize_with(color + 1, Vec::new);
        }
        classes[color].push(index);
    }

    classes.extend(overflow.into_iter().map(|i| vec![i]));
    classes
}
