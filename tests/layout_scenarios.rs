use crunsuck::error::LayoutError;
use crunsuck::ui::browser::Browser;
use crunsuck::ui::screen::{Geometry, Screen};
use crunsuck::ui::theme::Theme;
use crunsuck::ui::value::Value;
use crunsuck::ui::widget::{Container, Item, Widget};

type TestScreen = Screen<(), u32>;

fn screen(width: u16, height: u16) -> TestScreen {
    Screen::new(width, height, Theme::default())
}

#[test]
fn two_panes_split_an_80_column_terminal() {
    let mut s = screen(80, 24);
    let root = s.root();
    let row = s.horizontal(root, Value::fill(), Value::fill()).unwrap();
    let left = s.base(row, Value::relative(0.3), Value::fill()).unwrap();
    let right = s.base(row, Value::relative(0.7), Value::fill()).unwrap();
    s.redraw(root).unwrap();

    let left = s.geometry(left).unwrap();
    let right = s.geometry(right).unwrap();
    assert_eq!((left.width, left.height), (24, 24));
    assert_eq!((right.width, right.height), (56, 24));
    assert_eq!(left.x, 0);
    assert_eq!(right.x, 24);
}

#[test]
fn relative_extent_is_floored() {
    for extent in [1u16, 7, 33, 80, 199] {
        for m in [0.0, 0.1, 0.25, 0.3, 0.5, 0.66, 0.99, 1.0] {
            let mut s = screen(extent, 3);
            let root = s.root();
            let child = s.base(root, Value::relative(m), Value::fill()).unwrap();
            s.redraw(root).unwrap();
            let expected = (extent as f64 * m).floor() as i32;
            assert_eq!(s.geometry(child).unwrap().width, expected, "{m} of {extent}");
        }
    }
}

#[test]
fn nested_containers_shrink_and_lists_fill_them() {
    let mut s = screen(40, 12);
    let root = s.root();
    let frame = s
        .add_widget(root, Widget::Container(Container::new(true, Some("Episodes"))))
        .unwrap();
    let list = s.add_widget(frame, Widget::Browser(Browser::new())).unwrap();
    let rows: Vec<_> = (0..3)
        .map(|i| s.add_item(list, Item::new(format!("Episode {i}"), i)).unwrap())
        .collect();
    s.redraw(root).unwrap();

    assert_eq!(s.geometry(list), Some(Geometry { x: 1, y: 1, width: 38, height: 10 }));
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(
            s.geometry(*row),
            Some(Geometry { x: 1, y: 1 + i as i32, width: 38, height: 1 })
        );
    }
    assert!(s.line(1).contains("Episode 0"));
    assert!(s.line(0).contains("Episodes"));
}

#[test]
fn long_rows_are_truncated_with_ellipsis() {
    let mut s = screen(12, 3);
    let root = s.root();
    let list = s.add_widget(root, Widget::Browser(Browser::new())).unwrap();
    s.add_item(list, Item::new("Attack on Titan Final Season", 1)).unwrap();
    s.redraw(root).unwrap();
    assert_eq!(s.line(0), "Attack on...");
}

#[test]
fn assembly_mistakes_are_reported() {
    let mut s = screen(20, 5);
    let root = s.root();
    s.add_widget(root, Widget::Dummy).unwrap();
    assert_eq!(
        s.add_widget(root, Widget::Dummy).unwrap_err(),
        LayoutError::TooManyChildren("base layout")
    );

    let mut s = screen(20, 5);
    let root = s.root();
    let row = s.horizontal(root, Value::fill(), Value::fill()).unwrap();
    let err = s.add_item(row, Item::new("x", 0)).unwrap_err();
    assert!(matches!(err, LayoutError::WrongChildType(_)));
}

#[test]
fn zero_sized_terminal_draws_nothing() {
    let mut s = screen(0, 0);
    let root = s.root();
    let frame = s
        .add_widget(root, Widget::Container(Container::new(true, Some("Log"))))
        .unwrap();
    s.add_widget(frame, Widget::Dummy).unwrap();
    s.redraw(root).unwrap();
    assert_eq!(s.line(0), "");
}
