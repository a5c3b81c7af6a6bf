use crate::types::Place;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub name: &'static str,
    pub hex: &'static str,
}

const fn color(name: &'static str, hex: &'static str) -> Color {
    Color { name, hex }
}

/// Marker palette, in assignment order. Names follow the Leaflet awesome-markers
/// set; several of them (`lightred`, `darkpurple`) are not CSS colours, hence the hex.
pub const PALETTE: [Color; 19] = [
    color("red", "#d63e2a"),
    color("blue", "#38aadd"),
    color("green", "#72b026"),
    color("purple", "#d252b9"),
    color("orange", "#f69730"),
    color("darkred", "#a23336"),
    color("lightred", "#ff8e7f"),
    color("beige", "#ffcb92"),
    color("darkblue", "#0067a3"),
    color("darkgreen", "#728224"),
    color("cadetblue", "#436978"),
    color("darkpurple", "#5b396b"),
    color("white", "#fbfbfb"),
    color("pink", "#ff91ea"),
    color("lightblue", "#8adaff"),
    color("lightgreen", "#bbf970"),
    color("gray", "#575757"),
    color("black", "#303030"),
    color("lightgray", "#a3a3a3"),
];

/// Ordered category to colour mapping, rebuilt on every render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorMap {
    entries: Vec<(String, Color)>,
}

impl ColorMap {
    pub fn get(&self, category: &str) -> Option<Color> {
        self.entries.iter()
            .find(|(c, _)| c == category)
            .map(|(_, color)| *color)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Color)> {
        self.entries.iter().map(|(c, color)| (c.as_str(), *color))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Distinct categories in order of first appearance.
pub fn distinct_categories<'a, I>(places: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Place>,
{
    let mut seen = HashSet::new();
    places.into_iter()
        .filter(|&p| seen.insert(p.category.as_str()))
        .map(|p| p.category.clone())
        .collect()
}

/// The i-th category gets the i-th palette colour, wrapping past the end of the palette.
pub fn assign_colors(categories: &[String]) -> ColorMap {
    ColorMap {
        entries: categories.iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), PALETTE[i % PALETTE.len()]))
            .collect(),
    }
}

/// `None` keeps every category.
pub fn filter_by_categories<'a>(places: &'a [Place], selected: Option<&[String]>) -> Vec<&'a Place> {
    match selected {
        None => places.iter().collect(),
        Some(selected) => {
            let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
            places.iter()
                .filter(|p| selected.contains(p.category.as_str()))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(categories: &[&str]) -> Vec<Place> {
        categories.iter()
            .enumerate()
            .map(|(i, c)| Place::new(&format!("p{i}"), "addr", c).at(46.0, 2.0))
            .collect()
    }

    #[test]
    fn categories_keep_first_seen_order() {
        let p = places(&["food", "leisure", "food", "shop", "leisure"]);
        assert_eq!(distinct_categories(&p), vec!["food", "leisure", "shop"]);
    }

    #[test]
    fn colors_follow_palette_order() {
        let map = assign_colors(&["food".to_string(), "leisure".to_string()]);
        assert_eq!(map.get("food").map(|c| c.name), Some("red"));
        assert_eq!(map.get("leisure").map(|c| c.name), Some("blue"));
        assert_eq!(map.get("other"), None);
    }

    #[test]
    fn assignment_is_deterministic() {
        let p = places(&["b", "a", "c", "a"]);
        let first = assign_colors(&distinct_categories(&p));
        let second = assign_colors(&distinct_categories(&p));
        assert_eq!(first, second);
    }

    #[test]
    fn palette_wraps_after_nineteen() {
        let cats: Vec<String> = (0..21).map(|i| format!("c{i}")).collect();
        let map = assign_colors(&cats);
        assert_eq!(map.len(), 21);
        assert_eq!(map.get("c19"), Some(PALETTE[0]));
        assert_eq!(map.get("c20"), Some(PALETTE[1]));
        assert_eq!(map.get("c18"), Some(PALETTE[18]));
    }

    #[test]
    fn palette_entries_are_distinct() {
        let names: HashSet<_> = PALETTE.iter().map(|c| c.name).collect();
        let hexes: HashSet<_> = PALETTE.iter().map(|c| c.hex).collect();
        assert_eq!(names.len(), 19);
        assert_eq!(hexes.len(), 19);
    }

    #[test]
    fn filter_keeps_selected_categories() {
        let p = places(&["food", "leisure", "shop"]);
        let all = filter_by_categories(&p, None);
        assert_eq!(all.len(), 3);

        let selected = vec!["shop".to_string(), "food".to_string()];
        let kept = filter_by_categories(&p, Some(selected.as_slice()));
        assert_eq!(kept.iter().map(|p| p.category.as_str()).collect::<Vec<_>>(), ["food", "shop"]);

        let none: Vec<String> = Vec::new();
        assert!(filter_by_categories(&p, Some(none.as_slice())).is_empty());
    }
}
